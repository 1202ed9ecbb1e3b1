use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a camera could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFailure {
    PermissionDenied,
    NoDevice,
    Unsupported,
    ConstraintsUnsatisfiable,
}

impl std::fmt::Display for CameraFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PermissionDenied => "permission denied",
            Self::NoDevice => "no camera device",
            Self::Unsupported => "camera capture unsupported",
            Self::ConstraintsUnsatisfiable => "camera constraints cannot be satisfied",
        };
        f.write_str(s)
    }
}

/// Everything that can go wrong during one scan cycle.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScanError {
    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    #[error("file too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("camera unavailable: {0}")]
    CameraUnavailable(CameraFailure),

    #[error("classification service error: {0}")]
    ClassificationService(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("image does not have banknote proportions (aspect ratio {ratio:.2})")]
    UnsupportedShape { ratio: f32 },

    #[error("a scan is already in progress")]
    Busy,
}

/// Message category used to pick a localized error string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    InvalidFile,
    FileTooLarge,
    CameraUnavailable,
    ServiceError,
    UnsupportedLanguage,
    NotBanknote,
    Busy,
}

impl ScanError {
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::InvalidFileType(_) => FaultKind::InvalidFile,
            Self::FileTooLarge { .. } => FaultKind::FileTooLarge,
            Self::CameraUnavailable(_) => FaultKind::CameraUnavailable,
            Self::ClassificationService(_) => FaultKind::ServiceError,
            Self::UnsupportedLanguage(_) => FaultKind::UnsupportedLanguage,
            Self::UnsupportedShape { .. } => FaultKind::NotBanknote,
            Self::Busy => FaultKind::Busy,
        }
    }

    /// Whether this error moves the session into `Errored`.
    ///
    /// `Busy` and `UnsupportedLanguage` are rejected requests; the running
    /// cycle (if any) is left untouched.
    pub fn ends_cycle(&self) -> bool {
        !matches!(self, Self::Busy | Self::UnsupportedLanguage(_))
    }
}
