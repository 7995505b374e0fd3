//! Pixel codec capability and the built-in encoders.
//!
//! - [`RleCodec`]: RLE Lossless (PS3.5 Annex G)
//! - [`JpegBaselineCodec`]: JPEG Baseline, 8-bit, lossy
//! - [`JpegLsCodec`]: JPEG-LS Lossless (ITU-T T.87)
//! - [`Jpeg2000Codec`]: JPEG 2000 Lossless, reversible 5-3 (ISO/IEC 15444-1)

mod bits;
mod jpeg;
mod jpeg2000;
mod jpeg_ls;
mod mq;
mod rle;

pub use jpeg::JpegBaselineCodec;
pub use jpeg2000::Jpeg2000Codec;
pub use jpeg_ls::JpegLsCodec;
pub use rle::{RleCodec, packbits_encode};

use crate::models::CompressionScheme;
use std::sync::Arc;
use thiserror::Error;

/// Geometry of one native frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub rows: u16,
    pub columns: u16,
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    /// 0 = unsigned, 1 = two's complement
    pub pixel_representation: u16,
    /// 0 = samples interleaved per pixel, 1 = one plane per sample
    pub planar_configuration: u16,
}

impl FrameLayout {
    pub fn pixel_count(&self) -> usize {
        usize::from(self.rows) * usize::from(self.columns)
    }

    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_allocated / 8)
    }

    /// Size of one native frame in bytes.
    pub fn frame_len(&self) -> usize {
        self.pixel_count() * usize::from(self.samples_per_pixel) * self.bytes_per_sample()
    }

    pub fn is_signed(&self) -> bool {
        self.pixel_representation == 1
    }

    fn check_frame(&self, frame: &[u8]) -> Result<(), CodecError> {
        if frame.len() != self.frame_len() {
            return Err(CodecError::FrameSize {
                expected: self.frame_len(),
                actual: frame.len(),
            });
        }
        Ok(())
    }

    /// Reject layouts a sample-based encoder cannot take: partial bytes,
    /// more than 16 bits, or Bits Stored outside `min_bits..=Bits Allocated`.
    fn check_samples(&self, min_bits: u16) -> Result<(), CodecError> {
        if self.bits_allocated != 8 && self.bits_allocated != 16 {
            return Err(CodecError::Layout(format!(
                "bits allocated {} (8 or 16 supported)",
                self.bits_allocated
            )));
        }
        if self.bits_stored < min_bits || self.bits_stored > self.bits_allocated {
            return Err(CodecError::Layout(format!(
                "bits stored {} with {} bits allocated",
                self.bits_stored, self.bits_allocated
            )));
        }
        if self.samples_per_pixel != 1 && self.samples_per_pixel != 3 {
            return Err(CodecError::Layout(format!(
                "{} samples per pixel",
                self.samples_per_pixel
            )));
        }
        Ok(())
    }

    fn sample_mask(&self) -> u16 {
        match self.bits_stored {
            16.. => u16::MAX,
            bits => (1u16 << bits) - 1,
        }
    }

    /// Stored values of one component in raster order, masked to Bits Stored.
    fn component(&self, frame: &[u8], component: usize) -> Vec<u16> {
        let pixels = self.pixel_count();
        let samples = usize::from(self.samples_per_pixel);
        let mask = self.sample_mask();
        (0..pixels)
            .map(|pixel| {
                let index = if self.planar_configuration == 0 {
                    pixel * samples + component
                } else {
                    component * pixels + pixel
                };
                let raw = match self.bytes_per_sample() {
                    1 => u16::from(frame[index]),
                    _ => u16::from_le_bytes([frame[2 * index], frame[2 * index + 1]]),
                };
                raw & mask
            })
            .collect()
    }

    /// Sign-extend a masked stored value when the data is two's complement.
    fn signed_value(&self, stored: u16) -> i32 {
        let value = i32::from(stored);
        if self.is_signed() && self.bits_stored > 0 && (value >> (self.bits_stored - 1)) & 1 == 1 {
            value - (1 << self.bits_stored)
        } else {
            value
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("No encoder available for {0}")]
    Unsupported(CompressionScheme),

    #[error("Unsupported pixel layout: {0}")]
    Layout(String),

    #[error("Frame is {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Encoder failed: {0}")]
    Encoder(String),
}

/// Encodes native frames into one compressed transfer syntax.
pub trait PixelCodec: Send + Sync {
    fn scheme(&self) -> CompressionScheme;

    /// Encode one native little endian frame into a single fragment.
    fn encode_frame(&self, layout: &FrameLayout, frame: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Photometric Interpretation of the encoded frames, when the encoder
    /// changes the color model.
    fn photometric_interpretation(&self, _layout: &FrameLayout) -> Option<&'static str> {
        None
    }
}

/// One encoder per compression scheme, all implemented in this crate.
pub fn builtin_codecs() -> Vec<Arc<dyn PixelCodec>> {
    vec![
        Arc::new(JpegBaselineCodec::default()),
        Arc::new(Jpeg2000Codec),
        Arc::new(JpegLsCodec),
        Arc::new(RleCodec),
    ]
}

#[cfg(test)]
pub(crate) fn test_layout(rows: u16, columns: u16, samples: u16, bits: u16) -> FrameLayout {
    FrameLayout {
        rows,
        columns,
        samples_per_pixel: samples,
        bits_allocated: bits,
        bits_stored: bits,
        pixel_representation: 0,
        planar_configuration: 0,
    }
}
