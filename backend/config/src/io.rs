//! Locating, reading and writing `payguide.yaml`.

use crate::schema::PayGuideConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "PAYGUIDE_CONFIG";

const CONFIG_FILE_NAME: &str = "config.yaml";

/// `~/.payguide`, or `./.payguide` when there is no home directory.
pub fn config_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".payguide"),
        None => PathBuf::from(".payguide"),
    }
}

/// Priority: `--config` > `PAYGUIDE_CONFIG` > `~/.payguide/config.yaml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    resolve_config_path_with(explicit, std::env::var(CONFIG_PATH_ENV).ok())
}

pub fn resolve_config_path_with(explicit: Option<&Path>, env_value: Option<String>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = env_value.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }
    config_dir().join(CONFIG_FILE_NAME)
}

/// Parse the config file. A missing file yields the empty config.
pub async fn load_config(path: &Path) -> Result<PayGuideConfig> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(PayGuideConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses as YAML null.
    if raw.trim().is_empty() {
        return Ok(PayGuideConfig::default());
    }

    let config: PayGuideConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Write via a temp file and rename.
pub async fn write_config(config: &PayGuideConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::GatewayConfig;

    #[test]
    fn explicit_path_wins() {
        let p = resolve_config_path_with(Some(Path::new("/etc/pg.yaml")), Some("/tmp/env.yaml".into()));
        assert_eq!(p, PathBuf::from("/etc/pg.yaml"));
    }

    #[test]
    fn env_path_beats_default() {
        let p = resolve_config_path_with(None, Some("/tmp/env.yaml".into()));
        assert_eq!(p, PathBuf::from("/tmp/env.yaml"));
        let p = resolve_config_path_with(None, Some("  ".into()));
        assert!(p.ends_with(".payguide/config.yaml"));
    }

    #[tokio::test]
    async fn missing_and_empty_files_give_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert_eq!(load_config(&missing).await.unwrap(), PayGuideConfig::default());

        let empty = dir.path().join("empty.yaml");
        std::fs::write(&empty, "\n").unwrap();
        assert_eq!(load_config(&empty).await.unwrap(), PayGuideConfig::default());
    }

    #[tokio::test]
    async fn written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = PayGuideConfig {
            language: Some("ig".into()),
            gateway: Some(GatewayConfig { bind: None, port: Some(9000) }),
            ..Default::default()
        };
        write_config(&config, &path).await.unwrap();
        assert!(!path.with_extension("yaml.tmp").exists());
        assert_eq!(load_config(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "classifier: [unclosed").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config YAML"));
    }
}
