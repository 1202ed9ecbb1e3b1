//! Spoken and audible feedback for a scan.

use std::sync::Arc;

use payguide_core::{CanonicalLabel, Catalog, Language, ScanError};
use payguide_tts::{SoundEffect, SoundPlayer, SpeechOutput};
use tracing::warn;

/// Turns outcomes into localized messages and speaks them.
///
/// Speech and sound failures are logged and otherwise ignored.
pub struct Presenter {
    catalog: Arc<Catalog>,
    speech: Arc<dyn SpeechOutput>,
    sounds: Arc<dyn SoundPlayer>,
}

impl Presenter {
    pub fn new(catalog: Arc<Catalog>, speech: Arc<dyn SpeechOutput>, sounds: Arc<dyn SoundPlayer>) -> Self {
        Self { catalog, speech, sounds }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn announce_detecting(&self, language: Language) {
        let text = self.catalog.strings(language).detecting.clone();
        self.say(&text, language, SoundEffect::Loading).await;
    }

    pub async fn present_result(&self, label: CanonicalLabel, language: Language) {
        let text = self.catalog.result_message(label, language).to_string();
        let effect = if label.is_recognized() {
            SoundEffect::Success
        } else {
            SoundEffect::Error
        };
        self.say(&text, language, effect).await;
    }

    pub async fn present_fault(&self, error: &ScanError, language: Language) {
        let text = self.catalog.fault_message(error.kind(), language).to_string();
        self.say(&text, language, SoundEffect::Error).await;
    }

    /// Silence any utterance in progress.
    pub async fn stop(&self) {
        self.speech.cancel().await;
    }

    /// Wait for the last utterance to end.
    pub async fn finish(&self) {
        self.speech.finished().await;
    }

    async fn say(&self, text: &str, language: Language, effect: SoundEffect) {
        if let Err(e) = self.speech.speak(text, language).await {
            warn!(error = %e, "Speech output failed");
        }
        if let Err(e) = self.sounds.play(effect).await {
            warn!(error = %e, effect = ?effect, "Sound playback failed");
        }
    }
}
