//! On-device speech output.
//!
//! A new utterance always preempts the one in progress. Callers treat
//! failures as non-critical: nothing here is retried.
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use payguide_core::Language;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

const FINISH_POLL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Start speaking `text`, cutting off any current utterance.
    /// Returns once playback has started, not when it ends.
    async fn speak(&self, text: &str, language: Language) -> Result<()>;

    /// Stop the current utterance, if any.
    async fn cancel(&self);

    /// Wait until the current utterance has finished playing.
    async fn finished(&self) {}
}

// ---------------------------------------------------------------------------
// Command-driven synthesizer (espeak-ng, say, ...)
// ---------------------------------------------------------------------------

/// Runs a local synthesizer command per utterance.
///
/// Arguments may contain `{voice}` and `{text}` placeholders; when no argument
/// mentions `{text}`, the text is appended as the last argument.
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
    voices: HashMap<Language, String>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            voices: HashMap::new(),
            current: Mutex::new(None),
        }
    }

    /// espeak-ng with its stock voices for each language.
    pub fn espeak() -> Self {
        Self::new("espeak-ng", vec!["-v".into(), "{voice}".into(), "{text}".into()])
            .with_voice(Language::En, "en")
            .with_voice(Language::Yo, "yo")
            .with_voice(Language::Ig, "ig")
            .with_voice(Language::Ha, "ha")
    }

    pub fn with_voice(mut self, language: Language, voice: impl Into<String>) -> Self {
        self.voices.insert(language, voice.into());
        self
    }

    fn voice_for(&self, language: Language) -> &str {
        self.voices
            .get(&language)
            .map(String::as_str)
            .unwrap_or(language.code())
    }

    pub fn build_args(&self, text: &str, language: Language) -> Vec<String> {
        let voice = self.voice_for(language);
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{voice}", voice).replace("{text}", text))
            .collect();
        if !self.args.iter().any(|a| a.contains("{text}")) {
            args.push(text.to_string());
        }
        args
    }

    /// Whether an utterance is still playing.
    pub async fn is_speaking(&self) -> bool {
        let mut current = self.current.lock().await;
        match current.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[async_trait]
impl SpeechOutput for CommandSpeech {
    async fn speak(&self, text: &str, language: Language) -> Result<()> {
        let mut current = self.current.lock().await;
        if let Some(mut previous) = current.take() {
            let _ = previous.start_kill();
            debug!("[TTS] Preempted previous utterance");
        }

        let args = self.build_args(text, language);
        info!("[TTS] Speaking via {} lang={}", self.program, language);
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to launch speech command: {}", self.program))?;
        *current = Some(child);
        Ok(())
    }

    async fn cancel(&self) {
        if let Some(mut child) = self.current.lock().await.take() {
            let _ = child.start_kill();
        }
    }

    // The lock is dropped between polls so `cancel` can end the wait.
    async fn finished(&self) {
        loop {
            {
                let mut current = self.current.lock().await;
                let done = match current.as_mut() {
                    None => true,
                    Some(child) => match child.try_wait() {
                        Ok(None) => false,
                        Ok(Some(_)) => true,
                        Err(e) => {
                            debug!("[TTS] Waiting for utterance failed: {}", e);
                            true
                        }
                    },
                };
                if done {
                    *current = None;
                    return;
                }
            }
            tokio::time::sleep(FINISH_POLL).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Silent output
// ---------------------------------------------------------------------------

/// Speech disabled: accepts every utterance and says nothing.
#[derive(Debug, Default)]
pub struct SilentSpeech;

#[async_trait]
impl SpeechOutput for SilentSpeech {
    async fn speak(&self, text: &str, language: Language) -> Result<()> {
        debug!("[TTS] (silent) lang={} text={}", language, text);
        Ok(())
    }

    async fn cancel(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders() {
        let speech = CommandSpeech::espeak();
        assert_eq!(
            speech.build_args("₦50 - Naira Najeriya", Language::Ha),
            vec!["-v", "ha", "₦50 - Naira Najeriya"]
        );
    }

    #[test]
    fn appends_text_without_placeholder() {
        let speech = CommandSpeech::new("say", vec!["-r".into(), "180".into()]);
        assert_eq!(speech.build_args("hello", Language::En), vec!["-r", "180", "hello"]);
    }

    #[test]
    fn unknown_voice_uses_language_code() {
        let speech = CommandSpeech::new("espeak-ng", vec!["-v".into(), "{voice}".into()]);
        assert_eq!(speech.build_args("x", Language::Yo), vec!["-v", "yo", "x"]);
    }

    #[tokio::test]
    async fn new_utterance_preempts_and_cancel_stops() {
        let speech = CommandSpeech::new("sleep", vec!["{text}".into()]);
        speech.speak("5", Language::En).await.unwrap();
        assert!(speech.is_speaking().await);
        speech.speak("5", Language::En).await.unwrap();
        assert!(speech.is_speaking().await);
        speech.cancel().await;
        assert!(!speech.is_speaking().await);
    }

    #[tokio::test]
    async fn finished_waits_for_utterance() {
        let speech = CommandSpeech::new("sleep", vec!["{text}".into()]);
        speech.speak("0.1", Language::En).await.unwrap();
        speech.finished().await;
        assert!(!speech.is_speaking().await);
    }

    #[tokio::test]
    async fn cancel_is_not_blocked_by_finished() {
        let speech = std::sync::Arc::new(CommandSpeech::new("sleep", vec!["{text}".into()]));
        speech.speak("5", Language::En).await.unwrap();
        let waiter = {
            let speech = std::sync::Arc::clone(&speech);
            tokio::spawn(async move { speech.finished().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), speech.cancel())
            .await
            .expect("cancel waited for the utterance");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("finished kept waiting after cancel")
            .unwrap();
        assert!(!speech.is_speaking().await);
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let speech = CommandSpeech::new("/nonexistent/payguide-tts", vec![]);
        assert!(speech.speak("hi", Language::En).await.is_err());
        assert!(!speech.is_speaking().await);
    }

    #[tokio::test]
    async fn silent_speech_accepts_everything() {
        assert!(SilentSpeech.speak("anything", Language::Ig).await.is_ok());
    }
}
