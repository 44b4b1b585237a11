// Handle-addressed sounds driven by messages from the engine.
//
// The engine refers to sounds only by the integer handle returned from
// `Sound.create`; a handle stays valid until `Sound.unload` regardless of how
// many other sounds come and go.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Bridge::Transport;
use crate::Core::LookupList::LookupList;
use crate::Wire::Message::Message;

pub const IS_LOADING: &str = "SoundManager.is_loading";
pub const CREATE: &str = "Sound.create";
pub const DURATION: &str = "Sound.duration";
pub const IS_PLAYING: &str = "Sound.is_playing";
pub const PAUSE: &str = "Sound.pause";
pub const PLAY: &str = "Sound.play";
pub const POSITION: &str = "Sound.position";
pub const SET_POSITION: &str = "Sound.set_position";
pub const SET_VOLUME: &str = "Sound.set_volume";
pub const UNLOAD: &str = "Sound.unload";

pub const MESSAGE_TYPES: [&str; 10] = [
    IS_LOADING,
    CREATE,
    DURATION,
    IS_PLAYING,
    PAUSE,
    PLAY,
    POSITION,
    SET_POSITION,
    SET_VOLUME,
    UNLOAD,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SoundKind {
    /// Short clip, decoded up front and loaded asynchronously.
    Effect,
    /// Streamed track, ready as soon as it is opened.
    Music,
}

/// Result of asking the backend to open a file.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LoadStatus {
    Ready { duration: f64 },
    /// Completion arrives later through [`SoundManager::on_load_finished`].
    Pending,
    Failed,
}

/// Playback state of one sound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoundState {
    pub loading: bool,
    pub ready: bool,
    pub error: bool,
    pub playing: bool,
    pub repeating: bool,
    /// Paused by `pause_all`, to be restarted by `resume_all`.
    pub system_paused: bool,
    pub volume: f64,
    pub position: f64,
    pub duration: f64,
}

#[derive(Debug)]
pub struct Sound {
    pub kind: SoundKind,
    pub filepath: String,
    state: Mutex<SoundState>,
}

impl Sound {
    fn new(kind: SoundKind, filepath: String) -> Self {
        Self {
            kind,
            filepath,
            state: Mutex::new(SoundState {
                volume: 1.0,
                ..SoundState::default()
            }),
        }
    }

    pub fn state(&self) -> SoundState {
        self.state.lock().clone()
    }
}

/// Identity-keyed shared sound, so two sounds with the same path stay
/// distinct members of the handle list.
#[derive(Clone, Debug)]
pub struct SoundRef(pub Arc<Sound>);

impl PartialEq for SoundRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SoundRef {}

impl Hash for SoundRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

/// Platform audio. Every call happens with the manager's lock held, so
/// implementations must not call back into the manager.
pub trait SoundBackend: Send {
    fn load(&mut self, sound: &Sound) -> LoadStatus;
    fn play(&mut self, sound: &Sound, repeating: bool);
    fn pause(&mut self, sound: &Sound);
    fn seek(&mut self, sound: &Sound, seconds: f64);
    fn set_volume(&mut self, sound: &Sound, volume: f64);
    fn unload(&mut self, sound: &Sound);

    /// Current playback position in seconds.
    fn position(&mut self, sound: &Sound) -> f64 {
        sound.state.lock().position
    }

    /// False once a non-repeating sound has played to its end.
    fn is_playing(&mut self, sound: &Sound) -> bool {
        sound.state.lock().playing
    }
}

/// Backend with no audio output; sounds only track their state.
#[derive(Debug, Clone)]
pub struct NullSoundBackend {
    /// Reported for every loaded sound.
    pub duration: f64,
    /// Effects stay loading until `on_load_finished`.
    pub async_effects: bool,
}

impl Default for NullSoundBackend {
    fn default() -> Self {
        Self {
            duration: 1.0,
            async_effects: false,
        }
    }
}

impl SoundBackend for NullSoundBackend {
    fn load(&mut self, sound: &Sound) -> LoadStatus {
        match sound.kind {
            SoundKind::Effect if self.async_effects => LoadStatus::Pending,
            _ => LoadStatus::Ready {
                duration: self.duration,
            },
        }
    }

    fn play(&mut self, _sound: &Sound, _repeating: bool) {}
    fn pause(&mut self, _sound: &Sound) {}
    fn seek(&mut self, _sound: &Sound, _seconds: f64) {}
    fn set_volume(&mut self, _sound: &Sound, _volume: f64) {}
    fn unload(&mut self, _sound: &Sound) {}
}

struct Inner {
    sounds: LookupList<SoundRef>,
    backend: Box<dyn SoundBackend>,
}

pub struct SoundManager {
    inner: Mutex<Inner>,
    all_paused: AtomicBool,
}

impl SoundManager {
    pub fn new<B: SoundBackend + 'static>(backend: B) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                sounds: LookupList::new(),
                backend: Box::new(backend),
            }),
            all_paused: AtomicBool::new(false),
        })
    }

    /// Registers the `Sound.*` and `SoundManager.*` handlers on `transport`.
    pub fn install(self: &Arc<Self>, transport: &Transport) {
        let this = Arc::clone(self);
        transport.set_handler(IS_LOADING, move |m, _| {
            let loading = this.is_loading();
            m.reply().set_bool("is_loading", loading);
        });

        let this = Arc::clone(self);
        transport.set_handler(CREATE, move |m, _| {
            let filepath = m.get_string("filepath");
            let kind = if m.get_bool("is_music") {
                SoundKind::Music
            } else {
                SoundKind::Effect
            };
            let handle = this.create(kind, filepath);
            m.reply().set_i32("id", handle as i32);
        });

        let this = Arc::clone(self);
        transport.set_handler(DURATION, move |m, _| {
            if let Some(state) = this.state_for(m) {
                m.reply().set_f64("duration", state.duration);
            }
        });

        let this = Arc::clone(self);
        transport.set_handler(IS_PLAYING, move |m, _| {
            if let Some(playing) = this.is_playing(handle_field(m)) {
                m.reply().set_bool("is_playing", playing);
            }
        });

        let this = Arc::clone(self);
        transport.set_handler(PAUSE, move |m, _| {
            this.pause(handle_field(m));
        });

        let this = Arc::clone(self);
        transport.set_handler(PLAY, move |m, _| {
            let repeating = m.get_bool("is_repeating");
            this.play(handle_field(m), repeating);
        });

        let this = Arc::clone(self);
        transport.set_handler(POSITION, move |m, _| {
            if let Some(position) = this.position(handle_field(m)) {
                m.reply().set_f64("position", position);
            }
        });

        let this = Arc::clone(self);
        transport.set_handler(SET_POSITION, move |m, _| {
            let position = m.get_f64("position");
            this.set_position(handle_field(m), position);
        });

        let this = Arc::clone(self);
        transport.set_handler(SET_VOLUME, move |m, _| {
            let volume = m.get_f64("volume");
            this.set_volume(handle_field(m), volume);
        });

        let this = Arc::clone(self);
        transport.set_handler(UNLOAD, move |m, _| {
            this.unload(handle_field(m));
        });
    }

    /// Removes every handler installed by [`install`](Self::install).
    pub fn uninstall(&self, transport: &Transport) {
        for type_name in MESSAGE_TYPES {
            transport.remove_handler(type_name);
        }
    }

    fn state_for(&self, m: &mut Message) -> Option<SoundState> {
        let handle = handle_field(m);
        self.with_sound(handle, |sound, _| sound.state())
    }

    fn with_sound<R>(
        &self,
        handle: u32,
        f: impl FnOnce(&Sound, &mut dyn SoundBackend) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        match inner.sounds.get_by_handle(handle) {
            Ok(sound) => Some(f(&sound.0, inner.backend.as_mut())),
            Err(err) => {
                tracing::debug!(handle, %err, "sound request ignored");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sound(&self, handle: u32) -> Option<Arc<Sound>> {
        let inner = self.inner.lock();
        inner
            .sounds
            .get_by_handle(handle)
            .ok()
            .map(|sound| Arc::clone(&sound.0))
    }

    /// True while any sound is still loading.
    pub fn is_loading(&self) -> bool {
        let inner = self.inner.lock();
        let loading = inner.sounds.iter().any(|sound| sound.0.state.lock().loading);
        loading
    }

    pub fn create(&self, kind: SoundKind, filepath: String) -> u32 {
        let sound = Arc::new(Sound::new(kind, filepath));
        let mut inner = self.inner.lock();
        let status = inner.backend.load(&sound);
        {
            let mut state = sound.state.lock();
            match status {
                LoadStatus::Ready { duration } => {
                    state.ready = true;
                    state.duration = duration;
                }
                LoadStatus::Pending => state.loading = true,
                LoadStatus::Failed => {
                    state.error = true;
                    tracing::error!(filepath = %sound.filepath, "failed to load sound");
                }
            }
        }
        let handle = inner.sounds.id(SoundRef(Arc::clone(&sound)));
        tracing::debug!(handle, ?kind, filepath = %sound.filepath, "sound created");
        handle
    }

    /// Completes an asynchronous load started by the backend.
    pub fn on_load_finished(&self, handle: u32, success: bool, duration: f64) {
        self.with_sound(handle, |sound, _| {
            let mut state = sound.state.lock();
            state.loading = false;
            if success {
                state.ready = true;
                state.duration = duration;
                tracing::info!(filepath = %sound.filepath, "sound prepared");
            } else {
                state.error = true;
                tracing::error!(filepath = %sound.filepath, "failed to load sound");
            }
        });
    }

    /// Asks the backend whether the sound is still playing and records the
    /// answer. `None` for an unknown handle.
    pub fn is_playing(&self, handle: u32) -> Option<bool> {
        self.with_sound(handle, |sound, backend| {
            let playing = backend.is_playing(sound);
            sound.state.lock().playing = playing;
            playing
        })
    }

    pub fn position(&self, handle: u32) -> Option<f64> {
        self.with_sound(handle, |sound, backend| {
            let position = backend.position(sound);
            sound.state.lock().position = position;
            position
        })
    }

    pub fn play(&self, handle: u32, repeating: bool) {
        self.with_sound(handle, |sound, backend| {
            let mut state = sound.state.lock();
            state.repeating = repeating;
            if !state.ready {
                tracing::debug!(handle, "play requested before sound was ready");
                return;
            }
            state.playing = true;
            state.system_paused = false;
            backend.play(sound, repeating);
        });
    }

    pub fn pause(&self, handle: u32) {
        self.with_sound(handle, |sound, backend| {
            let mut state = sound.state.lock();
            if state.playing {
                state.playing = false;
                backend.pause(sound);
            }
        });
    }

    pub fn set_position(&self, handle: u32, seconds: f64) {
        self.with_sound(handle, |sound, backend| {
            let mut state = sound.state.lock();
            state.position = seconds.max(0.0);
            backend.seek(sound, state.position);
        });
    }

    pub fn set_volume(&self, handle: u32, volume: f64) {
        self.with_sound(handle, |sound, backend| {
            let mut state = sound.state.lock();
            state.volume = volume.clamp(0.0, 1.0);
            backend.set_volume(sound, state.volume);
        });
    }

    /// Releases the handle. Returns whether it referred to a live sound.
    pub fn unload(&self, handle: u32) -> bool {
        let mut inner = self.inner.lock();
        match inner.sounds.remove_by_handle(handle) {
            Ok(sound) => {
                inner.backend.unload(&sound.0);
                tracing::debug!(handle, filepath = %sound.0.filepath, "sound unloaded");
                true
            }
            Err(err) => {
                tracing::debug!(handle, %err, "unload ignored");
                false
            }
        }
    }

    /// Pauses every playing sound. Only the first call after a resume has any
    /// effect.
    pub fn pause_all(&self) {
        if self.all_paused.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        for sound in inner.sounds.iter() {
            let mut state = sound.0.state.lock();
            if state.playing {
                state.playing = false;
                state.system_paused = true;
                inner.backend.pause(&sound.0);
            }
        }
    }

    /// Restarts the sounds stopped by [`pause_all`](Self::pause_all).
    pub fn resume_all(&self) {
        if !self.all_paused.swap(false, Ordering::AcqRel) {
            return;
        }
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        for sound in inner.sounds.iter() {
            let mut state = sound.0.state.lock();
            if state.system_paused {
                state.system_paused = false;
                state.playing = true;
                inner.backend.play(&sound.0, state.repeating);
            }
        }
    }
}

fn handle_field(m: &mut Message) -> u32 {
    m.get_i32("id") as u32
}
