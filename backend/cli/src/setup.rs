//! Build a `ScanSession` from the loaded configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use payguide_config::{
    CameraConfig, ClassifierConfig, PayGuideConfig, SoundsConfig, SpeechConfig, UploadConfig,
};
use payguide_core::{Catalog, Classifier, Language};
use payguide_media::{AspectRange, CameraConstraints, CameraSession, FfmpegCamera, UploadPolicy};
use payguide_session::{Presenter, ScanSession};
use payguide_tts::{
    CommandSoundPlayer, CommandSpeech, SilentSoundPlayer, SilentSpeech, SoundPlayer, SpeechOutput,
};
use payguide_understanding::{VisionClassifier, VisionProvider, DEFAULT_TIMEOUT};
use tracing::{info, warn};

pub fn build_session(config: &PayGuideConfig, language: Option<&str>) -> Result<ScanSession> {
    let language = match language {
        Some(code) => Language::from_code(code)?,
        None => Language::from_code_or_default(config.language.as_deref().unwrap_or("en")),
    };

    let classifier = build_classifier(&config.classifier.clone().unwrap_or_default())?;
    let presenter = Presenter::new(
        Arc::new(Catalog::builtin()),
        build_speech(&config.speech.clone().unwrap_or_default()),
        build_sounds(&config.sounds.clone().unwrap_or_default()),
    );
    let policy = upload_policy(&config.upload.clone().unwrap_or_default());

    let session = ScanSession::new(classifier, presenter, policy, language);
    Ok(match build_camera(&config.camera.clone().unwrap_or_default()) {
        Some(camera) => session.with_camera(camera),
        None => session,
    })
}

pub fn build_classifier(cfg: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    let provider = match cfg.provider.as_deref() {
        Some("openai") => VisionProvider::OpenAi,
        _ => VisionProvider::Gemini,
    };
    let api_key = cfg
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .with_context(|| {
            format!(
                "No API key for the {} classifier; set classifier.apiKey or {}",
                provider.name(),
                payguide_config::env::api_key_var(provider.name()).unwrap_or("an API key variable")
            )
        })?;
    let model = cfg
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    let timeout = cfg.timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);

    let mut classifier = VisionClassifier::new(provider, api_key, model, timeout)?;
    if let Some(url) = &cfg.base_url {
        classifier = classifier.with_base_url(url.clone());
    }
    info!(provider = provider.name(), model = classifier.model(), "Classifier ready");
    Ok(Arc::new(classifier))
}

pub fn build_speech(cfg: &SpeechConfig) -> Arc<dyn SpeechOutput> {
    if cfg.enabled == Some(false) {
        return Arc::new(SilentSpeech);
    }
    let Some(command) = cfg.command.clone() else {
        return Arc::new(CommandSpeech::espeak());
    };
    let mut speech = CommandSpeech::new(command, cfg.args.clone().unwrap_or_default());
    for (code, voice) in &cfg.voices {
        match Language::from_code(code) {
            Ok(language) => speech = speech.with_voice(language, voice.clone()),
            Err(_) => warn!(code = %code, "Ignoring voice for unsupported language"),
        }
    }
    Arc::new(speech)
}

pub fn build_sounds(cfg: &SoundsConfig) -> Arc<dyn SoundPlayer> {
    match (cfg.enabled, &cfg.player, &cfg.dir) {
        (Some(true), Some(player), Some(dir)) => Arc::new(CommandSoundPlayer::new(
            player.clone(),
            cfg.args.clone().unwrap_or_default(),
            PathBuf::from(dir),
        )),
        _ => Arc::new(SilentSoundPlayer),
    }
}

pub fn build_camera(cfg: &CameraConfig) -> Option<CameraSession> {
    if cfg.enabled == Some(false) {
        return None;
    }
    let device = FfmpegCamera::new(
        cfg.ffmpeg_path.clone().unwrap_or_else(|| "ffmpeg".into()),
        cfg.input_format.clone()?,
        cfg.device.clone()?,
    );
    let constraints = CameraConstraints {
        width: cfg.width,
        height: cfg.height,
    };
    Some(CameraSession::new(Arc::new(device), constraints))
}

pub fn upload_policy(cfg: &UploadConfig) -> UploadPolicy {
    let defaults = UploadPolicy::default();
    UploadPolicy {
        max_bytes: cfg.max_bytes.unwrap_or(defaults.max_bytes),
        aspect_ratio: cfg.aspect_ratio.map(|r| AspectRange { min: r.min, max: r.max }),
    }
}
