pub mod catalog;
pub mod denomination;
pub mod error;
pub mod language;
pub mod state;
pub mod traits;
pub mod types;

pub use catalog::{Catalog, LanguagePack};
pub use denomination::{CanonicalLabel, Denomination, DENOMINATION_COUNT};
pub use error::{CameraFailure, FaultKind, ScanError};
pub use language::Language;
pub use state::{AcquireSource, ScanPhase};
pub use traits::Classifier;
pub use types::ImageBuffer;
