//! Config validation with field paths in every message.

use crate::schema::PayGuideConfig;
use payguide_core::Language;
use std::path::Path;
use thiserror::Error;

/// Upper bound for `upload.maxBytes`.
pub const MAX_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Check a defaulted config.
pub fn validate(config: &PayGuideConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_classifier(config, &mut report);
    validate_language(config, &mut report);
    validate_upload(config, &mut report);
    validate_camera(config, &mut report);
    validate_sounds(config, &mut report);
    validate_gateway(config, &mut report);
    report
}

fn validate_classifier(config: &PayGuideConfig, report: &mut ValidationReport) {
    let Some(classifier) = &config.classifier else { return };
    if let Some(provider) = &classifier.provider {
        if !matches!(provider.as_str(), "gemini" | "openai") {
            report.error(
                "classifier.provider",
                format!("Unknown provider '{provider}'. Use 'gemini' or 'openai'"),
            );
        }
    }
    if classifier.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
        report.warn(
            "classifier.apiKey",
            "No API key configured; scans will fail until one is set",
        );
    }
    if classifier.timeout_secs == Some(0) {
        report.error("classifier.timeoutSecs", "timeoutSecs must be >= 1");
    }
    if let Some(url) = &classifier.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            report.error("classifier.baseUrl", "baseUrl must start with http:// or https://");
        }
    }
}

fn validate_language(config: &PayGuideConfig, report: &mut ValidationReport) {
    let Some(code) = &config.language else { return };
    if Language::from_code(code).is_err() {
        report.warn("language", format!("Unsupported language '{code}'; falling back to en"));
    }
}

fn validate_upload(config: &PayGuideConfig, report: &mut ValidationReport) {
    let Some(upload) = &config.upload else { return };
    match upload.max_bytes {
        Some(0) => report.error("upload.maxBytes", "maxBytes must be > 0"),
        Some(n) if n > MAX_UPLOAD_LIMIT => report.error(
            "upload.maxBytes",
            format!("maxBytes cannot exceed {MAX_UPLOAD_LIMIT} (10 MB)"),
        ),
        _ => {}
    }
    if let Some(range) = upload.aspect_ratio {
        if !(range.min > 0.0 && range.min <= range.max) {
            report.error("upload.aspectRatio", "aspectRatio needs 0 < min <= max");
        }
    }
}

fn validate_camera(config: &PayGuideConfig, report: &mut ValidationReport) {
    let Some(camera) = &config.camera else { return };
    if camera.width == Some(0) || camera.height == Some(0) {
        report.error("camera", "width and height must be > 0");
    }
}

fn validate_sounds(config: &PayGuideConfig, report: &mut ValidationReport) {
    let Some(sounds) = &config.sounds else { return };
    if sounds.enabled != Some(true) {
        return;
    }
    if let Some(dir) = &sounds.dir {
        if !Path::new(dir).is_dir() {
            report.warn("sounds.dir", format!("Sound directory '{dir}' not found; cues will be skipped"));
        }
    }
}

fn validate_gateway(config: &PayGuideConfig, report: &mut ValidationReport) {
    let Some(gw) = &config.gateway else { return };
    match gw.port {
        Some(0) => report.error("gateway.port", "port must be > 0"),
        Some(port) if port < 1024 && port != 80 && port != 443 => report.warn(
            "gateway.port",
            format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
        ),
        _ => {}
    }
}
