pub mod engine;
pub mod sound;

pub use engine::{CommandSpeech, SilentSpeech, SpeechOutput};
pub use sound::{CommandSoundPlayer, SilentSoundPlayer, SoundEffect, SoundPlayer};
