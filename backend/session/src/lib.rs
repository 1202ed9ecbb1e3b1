//! One user's scan cycle: acquire, classify, normalize, present.

pub mod presenter;
pub mod session;

pub use presenter::Presenter;
pub use session::{Display, ImageSummary, ScanOutcome, ScanReport, ScanSession, SessionSnapshot};
