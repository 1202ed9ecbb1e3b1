//! Image acquisition: uploads, camera frames, and their transport encoding.

pub mod camera;
pub mod ffmpeg;
pub mod mime_detect;
pub mod shape;
pub mod transport;
pub mod upload;

pub use camera::{CameraConstraints, CameraDevice, CameraSession, CameraStream};
pub use ffmpeg::FfmpegCamera;
pub use mime_detect::{detect_mime_type, is_image, resolve_mime_type, sniff_mime_type};
pub use shape::{check_shape, image_dimensions, AspectRange};
pub use transport::{decode_base64, encode_base64, from_data_url, to_data_url, TransportError};
pub use upload::{read_upload, validate_upload, UploadPolicy, UploadedFile, MAX_UPLOAD_BYTES};
