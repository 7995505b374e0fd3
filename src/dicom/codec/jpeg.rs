//! JPEG Baseline (Process 1) through the `jpeg-encoder` crate.

use super::{CodecError, FrameLayout, PixelCodec};
use crate::models::CompressionScheme;
use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use std::borrow::Cow;

pub const DEFAULT_QUALITY: u8 = 90;

/// 8-bit monochrome or RGB to baseline JPEG. Color frames come out as
/// YCbCr with 4:2:2 chroma subsampling.
#[derive(Debug, Clone, Copy)]
pub struct JpegBaselineCodec {
    quality: u8,
}

impl Default for JpegBaselineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl JpegBaselineCodec {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl PixelCodec for JpegBaselineCodec {
    fn scheme(&self) -> CompressionScheme {
        CompressionScheme::Jpeg
    }

    fn encode_frame(&self, layout: &FrameLayout, frame: &[u8]) -> Result<Vec<u8>, CodecError> {
        layout.check_frame(frame)?;
        if layout.bits_allocated != 8 {
            return Err(CodecError::Layout(format!(
                "JPEG Baseline takes 8-bit samples, got {} bits allocated",
                layout.bits_allocated
            )));
        }
        if layout.is_signed() {
            return Err(CodecError::Layout(
                "JPEG Baseline takes unsigned samples".to_string(),
            ));
        }

        let (color, sampling) = match layout.samples_per_pixel {
            1 => (ColorType::Luma, SamplingFactor::F_1_1),
            3 => (ColorType::Rgb, SamplingFactor::F_2_1),
            n => {
                return Err(CodecError::Layout(format!("{} samples per pixel", n)));
            }
        };

        let data: Cow<'_, [u8]> = if layout.samples_per_pixel == 3 && layout.planar_configuration == 1 {
            Cow::Owned(interleave(layout, frame))
        } else {
            Cow::Borrowed(frame)
        };

        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out, self.quality);
        encoder.set_sampling_factor(sampling);
        encoder
            .encode(&data, layout.columns, layout.rows, color)
            .map_err(|e| CodecError::Encoder(e.to_string()))?;

        if out.len() % 2 == 1 {
            out.push(0);
        }
        Ok(out)
    }

    fn photometric_interpretation(&self, layout: &FrameLayout) -> Option<&'static str> {
        (layout.samples_per_pixel == 3).then_some("YBR_FULL_422")
    }
}

fn interleave(layout: &FrameLayout, frame: &[u8]) -> Vec<u8> {
    let planes: Vec<Vec<u16>> = (0..3).map(|c| layout.component(frame, c)).collect();
    (0..layout.pixel_count())
        .flat_map(|pixel| planes.iter().map(move |plane| plane[pixel] as u8))
        .collect()
}
