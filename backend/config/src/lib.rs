//! `payguide-config` — runtime configuration.
//!
//! YAML read/write, `${ENV_VAR}` substitution, defaults, validation and
//! redaction for display.

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_fallbacks, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, load_config, resolve_config_path, write_config, CONFIG_PATH_ENV};
pub use redact::redact;
pub use schema::{
    AspectRatioConfig, CameraConfig, ClassifierConfig, GatewayConfig, LoggingConfig,
    PayGuideConfig, SoundsConfig, SpeechConfig, UploadConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, apply defaults and validate.
///
/// Warnings are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<PayGuideConfig> {
    load_and_prepare_with(path, &std::env::vars().collect()).await
}

pub async fn load_and_prepare_with(path: &Path, env: &HashMap<String, String>) -> Result<PayGuideConfig> {
    let raw_config = load_config(path).await?;

    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: PayGuideConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_fallbacks(apply_all_defaults(config), env);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let summary: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid config at {}:\n{}", path.display(), summary.join("\n"));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payguide.yaml");
        std::fs::write(
            &path,
            "classifier:\n  apiKey: ${PG_KEY}\nlanguage: yo\ngateway:\n  port: 9090\n",
        )
        .unwrap();

        let cfg = load_and_prepare_with(&path, &env(&[("PG_KEY", "AIza-secret")])).await.unwrap();
        let classifier = cfg.classifier.unwrap();
        assert_eq!(classifier.api_key.as_deref(), Some("AIza-secret"));
        assert_eq!(classifier.provider.as_deref(), Some("gemini"));
        assert_eq!(cfg.language.as_deref(), Some("yo"));
        assert_eq!(cfg.gateway.unwrap().port, Some(9090));
    }

    #[tokio::test]
    async fn missing_file_uses_env_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let cfg = load_and_prepare_with(&path, &env(&[("GEMINI_API_KEY", "AIza-env")])).await.unwrap();
        assert_eq!(cfg.classifier.unwrap().api_key.as_deref(), Some("AIza-env"));
    }

    #[tokio::test]
    async fn validation_errors_abort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payguide.yaml");
        std::fs::write(&path, "classifier:\n  timeoutSecs: 0\n").unwrap();
        let err = load_and_prepare_with(&path, &HashMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("classifier.timeoutSecs"));
    }

    #[tokio::test]
    async fn unresolved_reference_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payguide.yaml");
        std::fs::write(&path, "classifier:\n  apiKey: ${NOT_SET_ANYWHERE}\n").unwrap();
        let err = load_and_prepare_with(&path, &HashMap::new()).await.unwrap_err();
        assert!(format!("{err:#}").contains("NOT_SET_ANYWHERE"));
    }
}
