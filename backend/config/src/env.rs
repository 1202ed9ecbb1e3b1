//! `${VAR}` substitution over the config value tree, plus API key fallbacks.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are substituted. `$${VAR}` is an
//! escape and yields a literal `${VAR}`.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{ClassifierConfig, PayGuideConfig};

/// Matches both `${VAR}` and the escaped `$${VAR}`.
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute against the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute against `env`. Unset or empty variables are an error.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute(value, env, "")?)
}

fn substitute(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_str(s, env, path).map(Value::String),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                out.insert(k.clone(), substitute(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_str(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }
    let mut missing = None;
    let out = ENV_REF.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(v) => v.clone(),
            None => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });
    match missing {
        Some(err) => Err(err),
        None => Ok(out.into_owned()),
    }
}

/// Variable consulted when `classifier.apiKey` is unset.
pub fn api_key_var(provider: &str) -> Option<&'static str> {
    match provider {
        "gemini" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        _ => None,
    }
}

/// Fill a missing classifier API key from the provider's conventional
/// environment variable. Run after defaults so the provider is known.
pub fn apply_env_fallbacks(mut config: PayGuideConfig, env: &HashMap<String, String>) -> PayGuideConfig {
    let classifier = config.classifier.get_or_insert_with(ClassifierConfig::default);
    let has_key = classifier.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
    if !has_key {
        let var = classifier.provider.as_deref().and_then(api_key_var);
        if let Some(key) = var.and_then(|v| env.get(v)).filter(|k| !k.is_empty()) {
            tracing::debug!(var = var.unwrap_or_default(), "Using classifier API key from environment");
            classifier.api_key = Some(key.clone());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_values() {
        let v = json!({"classifier": {"apiKey": "${GEMINI_API_KEY}"}, "args": ["-v", "${VOICE}"]});
        let out = resolve_env_vars_with(&v, &env(&[("GEMINI_API_KEY", "AIza123"), ("VOICE", "yo")])).unwrap();
        assert_eq!(out["classifier"]["apiKey"], "AIza123");
        assert_eq!(out["args"][1], "yo");
    }

    #[test]
    fn missing_var_names_path() {
        let v = json!({"classifier": {"apiKey": "${NOPE}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("NOPE"));
        assert!(err.contains("classifier.apiKey"));
    }

    #[test]
    fn empty_var_counts_as_missing() {
        let v = json!({"k": "${EMPTY}"});
        assert!(resolve_env_vars_with(&v, &env(&[("EMPTY", "")])).is_err());
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"k": "$${HOME} and ${USER_NAME}"});
        let out = resolve_env_vars_with(&v, &env(&[("USER_NAME", "ada")])).unwrap();
        assert_eq!(out["k"], "${HOME} and ada");
    }

    #[test]
    fn lowercase_names_are_left_alone() {
        let v = json!({"k": "${lower}", "n": 5});
        let out = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(out["k"], "${lower}");
        assert_eq!(out["n"], 5);
    }

    #[test]
    fn api_key_falls_back_per_provider() {
        let mut cfg = PayGuideConfig::default();
        cfg.classifier = Some(ClassifierConfig { provider: Some("openai".into()), ..Default::default() });
        let vars = env(&[("OPENAI_API_KEY", "sk-env"), ("GEMINI_API_KEY", "AIza-env")]);
        let cfg = apply_env_fallbacks(cfg, &vars);
        assert_eq!(cfg.classifier.unwrap().api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn configured_key_wins_over_env() {
        let mut cfg = PayGuideConfig::default();
        cfg.classifier = Some(ClassifierConfig {
            provider: Some("gemini".into()),
            api_key: Some("AIza-file".into()),
            ..Default::default()
        });
        let cfg = apply_env_fallbacks(cfg, &env(&[("GEMINI_API_KEY", "AIza-env")]));
        assert_eq!(cfg.classifier.unwrap().api_key.as_deref(), Some("AIza-file"));
    }
}
