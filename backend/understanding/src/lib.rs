pub mod normalizer;
pub mod vision;

pub use normalizer::normalize;
pub use vision::{VisionClassifier, VisionProvider, CLASSIFICATION_PROMPT, DEFAULT_TIMEOUT};
