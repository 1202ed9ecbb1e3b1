//! Banknote proportion check.
//!
//! Only the image header is decoded; pixel data is never loaded.

use std::io::Cursor;

use image::ImageReader;
use payguide_core::ScanError;

/// Accepted width/height ratio range, inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRange {
    pub min: f32,
    pub max: f32,
}

impl AspectRange {
    pub fn contains(&self, ratio: f32) -> bool {
        ratio >= self.min && ratio <= self.max
    }
}

/// Read `(width, height)` from an encoded image.
pub fn image_dimensions(data: &[u8]) -> Result<(u32, u32), ScanError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ScanError::InvalidFileType(format!("unreadable image: {e}")))?
        .into_dimensions()
        .map_err(|e| ScanError::InvalidFileType(format!("unreadable image: {e}")))
}

/// Reject images whose proportions fall outside `range`.
///
/// Portrait shots are accepted too: the ratio is taken as long side over
/// short side.
pub fn check_shape(data: &[u8], range: &AspectRange) -> Result<(), ScanError> {
    let (w, h) = image_dimensions(data)?;
    if w == 0 || h == 0 {
        return Err(ScanError::InvalidFileType("image has no pixels".into()));
    }
    let ratio = w.max(h) as f32 / w.min(h) as f32;
    if range.contains(ratio) {
        Ok(())
    } else {
        Err(ScanError::UnsupportedShape { ratio })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    const BANKNOTE: AspectRange = AspectRange { min: 2.0, max: 2.4 };

    #[test]
    fn reads_dimensions() {
        assert_eq!(image_dimensions(&png(44, 20)).unwrap(), (44, 20));
    }

    #[test]
    fn accepts_banknote_proportions() {
        assert!(check_shape(&png(44, 20), &BANKNOTE).is_ok());
        assert!(check_shape(&png(20, 44), &BANKNOTE).is_ok());
    }

    #[test]
    fn rejects_square_image() {
        let err = check_shape(&png(30, 30), &BANKNOTE).unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedShape { ratio } if (ratio - 1.0).abs() < 1e-6));
    }

    #[test]
    fn garbage_is_invalid_file() {
        let err = check_shape(b"definitely not an image", &BANKNOTE).unwrap_err();
        assert!(matches!(err, ScanError::InvalidFileType(_)));
    }
}
