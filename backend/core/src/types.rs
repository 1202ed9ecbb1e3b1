use bytes::Bytes;

/// An encoded image owned by the current scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pub data: Bytes,
    pub mime_type: String,
    /// File name or device the image came from, for logging.
    pub source: String,
}

impl ImageBuffer {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            source: source.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
