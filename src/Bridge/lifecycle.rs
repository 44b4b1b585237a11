// Well-known message types exchanged over the host lifecycle.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::transport::Transport;
use crate::Resources::sound::SoundManager;

pub const ON_LAUNCH: &str = "Application.on_launch";
pub const ON_START: &str = "Application.on_start";
pub const ON_STOP: &str = "Application.on_stop";
pub const ON_SAVE: &str = "Application.on_save";

pub const APPLICATION_DATA_FOLDER: &str = "application_data_folder";
pub const USER_DATA_FOLDER: &str = "user_data_folder";
pub const CACHE_FOLDER: &str = "cache_folder";

/// Host folders announced to the engine at launch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataFolders {
    pub application_data: PathBuf,
    pub user_data: PathBuf,
    pub cache: PathBuf,
}

/// Drives the launch / pause / resume notifications for one transport.
///
/// `launch` is posted once; later calls are ignored. Pausing is sent
/// synchronously (`on_save` then `on_stop`) so the engine has persisted its
/// state before the host suspends; resuming is posted. Attached sounds are
/// paused before `on_save` and resumed before `on_start`.
#[derive(Default)]
pub struct Lifecycle {
    launched: AtomicBool,
    paused: AtomicBool,
    sounds: Option<Arc<SoundManager>>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("launched", &self.is_launched())
            .field("paused", &self.is_paused())
            .field("sounds", &self.sounds.as_ref().map(|s| s.len()))
            .finish()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses and resumes `sounds` together with the application.
    pub fn with_sounds(mut self, sounds: Arc<SoundManager>) -> Self {
        self.sounds = Some(sounds);
        self
    }

    pub fn is_launched(&self) -> bool {
        self.launched.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Posts `Application.on_launch`. Returns `false` if already launched.
    pub fn launch(&self, transport: &Transport, folders: &DataFolders) -> bool {
        if self.launched.swap(true, Ordering::AcqRel) {
            tracing::debug!("launch requested twice; ignored");
            return false;
        }

        let mut message = transport.create(ON_LAUNCH);
        message
            .set_str(
                APPLICATION_DATA_FOLDER,
                &folders.application_data.to_string_lossy(),
            )
            .set_str(USER_DATA_FOLDER, &folders.user_data.to_string_lossy())
            .set_str(CACHE_FOLDER, &folders.cache.to_string_lossy());
        transport.post(message);
        tracing::info!(?folders, "application launched");
        true
    }

    /// Sends `Application.on_save` then `Application.on_stop`.
    pub fn pause(&self, transport: &Transport) {
        if self.paused.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(sounds) = &self.sounds {
            sounds.pause_all();
        }
        for type_name in [ON_SAVE, ON_STOP] {
            if let Some(reply) = transport.send(transport.create(type_name)) {
                transport.recycle(reply);
            }
        }
        tracing::info!("application paused");
    }

    /// Posts `Application.on_start`.
    pub fn resume(&self, transport: &Transport) {
        if !self.paused.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(sounds) = &self.sounds {
            sounds.resume_all();
        }
        transport.post(transport.create(ON_START));
        tracing::info!("application resumed");
    }
}
