use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Languages the reader can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Yo,
    Ig,
    Ha,
}

impl Language {
    pub const ALL: [Language; 4] = [Self::En, Self::Yo, Self::Ig, Self::Ha];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Yo => "yo",
            Self::Ig => "ig",
            Self::Ha => "ha",
        }
    }

    /// Name shown in the language selector, in the language itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Yo => "Yorùbá",
            Self::Ig => "Igbo",
            Self::Ha => "Hausa",
        }
    }

    /// Parse a language code. Case and surrounding whitespace are ignored.
    pub fn from_code(code: &str) -> Result<Self, ScanError> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "yo" => Ok(Self::Yo),
            "ig" => Ok(Self::Ig),
            "ha" => Ok(Self::Ha),
            _ => Err(ScanError::UnsupportedLanguage(code.to_string())),
        }
    }

    /// Parse a code, falling back to English when it is not supported.
    pub fn from_code_or_default(code: &str) -> Self {
        Self::from_code(code).unwrap_or_else(|_| {
            tracing::warn!(code = %code, "Unsupported language code; falling back to en");
            Self::En
        })
    }
}

impl FromStr for Language {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
