//! Image attachments: decode, downscale, JPEG re-encode, base64.

use crate::constants::limits;
use crate::error::EncodingError;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder};
use std::path::{Path, PathBuf};

/// Where a pending image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Session-local handle recorded on the message, if the source has one.
    pub fn reference(&self) -> Option<String> {
        match self {
            ImageSource::Path(path) => Some(path.display().to_string()),
            ImageSource::Bytes(_) => None,
        }
    }

    fn read(&self) -> Result<Vec<u8>, EncodingError> {
        match self {
            ImageSource::Path(path) => Ok(std::fs::read(path)?),
            ImageSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

/// A JPEG ready to be inlined into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    /// Standard base64, no line wrapping.
    pub base64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.base64)
    }
}

/// Size that fits within `max` on both sides, keeping the aspect ratio.
/// Images already small enough are left alone.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let ratio = f64::min(max as f64 / width as f64, max as f64 / height as f64);
    let new_width = ((width as f64 * ratio) as u32).max(1);
    let new_height = ((height as f64 * ratio) as u32).max(1);
    (new_width, new_height)
}

pub fn encode_bytes(bytes: &[u8]) -> Result<EncodedImage, EncodingError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| EncodingError::Decode(e.to_string()))?;

    let (width, height) = fit_within(
        decoded.width(),
        decoded.height(),
        limits::MAX_IMAGE_DIMENSION,
    );
    let resized = if (width, height) != (decoded.width(), decoded.height()) {
        tracing::debug!(
            "Resized image from {}x{} to {}x{}",
            decoded.width(),
            decoded.height(),
            width,
            height
        );
        decoded.resize_exact(width, height, FilterType::Triangle)
    } else {
        decoded
    };

    // JPEG has no alpha channel.
    let rgb = resized.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, limits::JPEG_QUALITY)
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodingError::Encode(e.to_string()))?;

    tracing::debug!("Final image size: {} bytes", jpeg.len());
    if jpeg.len() > limits::MAX_IMAGE_BYTES {
        return Err(EncodingError::TooLarge { bytes: jpeg.len() });
    }

    Ok(EncodedImage {
        width,
        height,
        base64: base64::engine::general_purpose::STANDARD.encode(&jpeg),
    })
}

pub fn encode_image(source: &ImageSource) -> Result<EncodedImage, EncodingError> {
    encode_bytes(&source.read()?)
}

/// [`encode_image`] on the blocking pool, keeping the caller's task free
/// while the image is decoded and re-encoded.
pub async fn encode_image_async(source: ImageSource) -> Result<EncodedImage, EncodingError> {
    tokio::task::spawn_blocking(move || encode_image(&source))
        .await
        .map_err(|e| EncodingError::Encode(format!("encoder task failed: {e}")))?
}
