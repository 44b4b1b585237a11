pub mod sound;

pub use sound::{LoadStatus, NullSoundBackend, Sound, SoundBackend, SoundKind, SoundManager};
