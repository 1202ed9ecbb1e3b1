//! Fill unset config fields with working defaults.

use crate::io::config_dir;
use crate::schema::{
    CameraConfig, ClassifierConfig, GatewayConfig, LoggingConfig, PayGuideConfig, SoundsConfig,
    SpeechConfig, UploadConfig,
};

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[cfg(target_os = "macos")]
const DEFAULT_CAMERA_INPUT: (&str, &str) = ("avfoundation", "0");
#[cfg(target_os = "windows")]
const DEFAULT_CAMERA_INPUT: (&str, &str) = ("dshow", "video=Integrated Camera");
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_CAMERA_INPUT: (&str, &str) = ("v4l2", "/dev/video0");

pub fn apply_all_defaults(config: PayGuideConfig) -> PayGuideConfig {
    let config = apply_classifier_defaults(config);
    let config = apply_upload_defaults(config);
    let config = apply_camera_defaults(config);
    let config = apply_speech_defaults(config);
    let config = apply_sound_defaults(config);
    let config = apply_gateway_defaults(config);
    apply_logging_defaults(config)
}

fn apply_classifier_defaults(mut config: PayGuideConfig) -> PayGuideConfig {
    let classifier = config.classifier.get_or_insert_with(ClassifierConfig::default);
    classifier.provider.get_or_insert_with(|| DEFAULT_PROVIDER.to_string());
    classifier.timeout_secs.get_or_insert(DEFAULT_TIMEOUT_SECS);
    config.language.get_or_insert_with(|| DEFAULT_LANGUAGE.to_string());
    config
}

fn apply_upload_defaults(mut config: PayGuideConfig) -> PayGuideConfig {
    let upload = config.upload.get_or_insert_with(UploadConfig::default);
    upload.max_bytes.get_or_insert(DEFAULT_MAX_UPLOAD_BYTES);
    config
}

fn apply_camera_defaults(mut config: PayGuideConfig) -> PayGuideConfig {
    let camera = config.camera.get_or_insert_with(CameraConfig::default);
    let (format, device) = DEFAULT_CAMERA_INPUT;
    camera.enabled.get_or_insert(true);
    camera.ffmpeg_path.get_or_insert_with(|| "ffmpeg".to_string());
    camera.input_format.get_or_insert_with(|| format.to_string());
    camera.device.get_or_insert_with(|| device.to_string());
    config
}

fn apply_speech_defaults(mut config: PayGuideConfig) -> PayGuideConfig {
    let speech = config.speech.get_or_insert_with(SpeechConfig::default);
    speech.enabled.get_or_insert(true);
    if speech.command.is_none() {
        speech.command = Some("espeak-ng".to_string());
        speech
            .args
            .get_or_insert_with(|| vec!["-v".into(), "{voice}".into(), "{text}".into()]);
    }
    speech.args.get_or_insert_with(Vec::new);
    config
}

fn apply_sound_defaults(mut config: PayGuideConfig) -> PayGuideConfig {
    let sounds = config.sounds.get_or_insert_with(SoundsConfig::default);
    sounds.enabled.get_or_insert(true);
    sounds
        .dir
        .get_or_insert_with(|| config_dir().join("sounds").to_string_lossy().into_owned());
    if sounds.player.is_none() {
        sounds.player = Some("ffplay".to_string());
        sounds.args.get_or_insert_with(|| {
            ["-nodisp", "-autoexit", "-loglevel", "quiet"].map(String::from).to_vec()
        });
    }
    sounds.args.get_or_insert_with(Vec::new);
    config
}

fn apply_gateway_defaults(mut config: PayGuideConfig) -> PayGuideConfig {
    let gateway = config.gateway.get_or_insert_with(GatewayConfig::default);
    gateway.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    gateway.port.get_or_insert(DEFAULT_PORT);
    config
}

fn apply_logging_defaults(mut config: PayGuideConfig) -> PayGuideConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}
