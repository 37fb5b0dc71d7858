//! Decoded RGBA8 pixel buffers shared by image and video nodes.

use crate::shapes::SerializableColor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors that can occur while turning file bytes into pixels.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no image data")]
    Empty,
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA8")]
    InvalidDimensions { width: u32, height: u32, len: usize },
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// An immutable RGBA8 bitmap.
///
/// Every bitmap gets a fresh generation number; renderers use it to tell
/// whether the pixels behind a node changed since the last frame.
#[derive(Debug, Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Arc<Vec<u8>>,
    generation: u64,
}

impl Bitmap {
    /// Wrap an RGBA8 buffer. The buffer must hold exactly `width * height * 4` bytes.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(DecodeError::InvalidDimensions {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data: Arc::new(data),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Decode an encoded image file (PNG, JPEG, WebP, GIF or BMP).
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba8(width, height, rgba.into_raw())
    }

    /// A bitmap filled with one color.
    pub fn solid(width: u32, height: u32, color: SerializableColor) -> Result<Self, DecodeError> {
        let pixels = width as usize * height as usize;
        let data = [color.r, color.g, color.b, color.a].repeat(pixels);
        Self::from_rgba8(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the pixel buffer, for zero-copy hand-off to GPU blobs.
    pub fn shared_data(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.data)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let bitmap = Bitmap::decode(&encode_png(3, 2)).unwrap();
        assert_eq!(bitmap.width(), 3);
        assert_eq!(bitmap.height(), 2);
        assert_eq!(bitmap.data().len(), 3 * 2 * 4);
        assert_eq!(&bitmap.data()[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(Bitmap::decode(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            Bitmap::decode(b"definitely not an image"),
            Err(DecodeError::Image(_))
        ));
    }

    #[test]
    fn test_from_rgba8_rejects_wrong_length() {
        let err = Bitmap::from_rgba8(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidDimensions { width: 2, height: 2, len: 15 }
        ));
    }

    #[test]
    fn test_generations_are_unique() {
        let a = Bitmap::solid(1, 1, SerializableColor::white()).unwrap();
        let b = Bitmap::solid(1, 1, SerializableColor::white()).unwrap();
        assert_ne!(a.generation(), b.generation());
        assert_eq!(a.clone().generation(), a.generation());
    }
}
