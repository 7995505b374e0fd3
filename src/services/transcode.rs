use crate::dicom::codec::builtin_codecs;
use crate::dicom::{CodecError, FrameLayout, PixelCodec, uids};
use crate::models::{Artifact, CompressionScheme, DataSet, Element, Tag, Value, Vr, tags};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that stop an artifact from being converted
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Cannot transcode from {0}: source pixel data must be uncompressed")]
    UnsupportedSource(String),

    #[error("Missing required attribute {0}")]
    MissingAttribute(Tag),

    #[error("Invalid pixel data: {0}")]
    InvalidPixelData(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Encoders available to the transcoder, one per scheme.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<CompressionScheme, Arc<dyn PixelCodec>>,
}

impl CodecRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with an encoder for every scheme
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for codec in builtin_codecs() {
            registry.register(codec);
        }
        registry
    }

    /// Add or replace the encoder for the codec's scheme
    pub fn register(&mut self, codec: Arc<dyn PixelCodec>) {
        self.codecs.insert(codec.scheme(), codec);
    }

    pub fn get(&self, scheme: CompressionScheme) -> Option<&Arc<dyn PixelCodec>> {
        self.codecs.get(&scheme)
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut schemes: Vec<_> = self.codecs.keys().map(|s| s.name()).collect();
        schemes.sort_unstable();
        f.debug_struct("CodecRegistry").field("schemes", &schemes).finish()
    }
}

/// Re-encodes an artifact's pixel data into a compressed transfer syntax.
#[derive(Debug, Clone)]
pub struct ArtifactTranscoder {
    codecs: CodecRegistry,
}

impl Default for ArtifactTranscoder {
    fn default() -> Self {
        Self::new(CodecRegistry::with_builtin())
    }
}

impl ArtifactTranscoder {
    pub fn new(codecs: CodecRegistry) -> Self {
        Self { codecs }
    }

    /// Transcode into `scheme`, or return the artifact unchanged when no
    /// scheme is requested or it is already encoded that way.
    ///
    /// The transfer syntax declaration always matches the pixel encoding of
    /// the returned artifact.
    pub fn transcode(
        &self,
        artifact: Artifact,
        scheme: Option<CompressionScheme>,
    ) -> Result<Artifact, ConversionError> {
        let Some(scheme) = scheme else {
            return Ok(artifact);
        };

        let target = scheme.transfer_syntax_uid();
        let source = artifact.transfer_syntax();
        if source == target {
            tracing::debug!("Already encoded as {}, nothing to transcode", scheme);
            return Ok(artifact);
        }
        if !uids::is_native(&source) {
            return Err(ConversionError::UnsupportedSource(source));
        }

        let codec = self
            .codecs
            .get(scheme)
            .ok_or(CodecError::Unsupported(scheme))?;

        let encoded = match artifact.dataset.get(tags::PIXEL_DATA) {
            Some(pixel_data) => Some(encode_frames(codec.as_ref(), &artifact.dataset, pixel_data)?),
            None => None,
        };

        let mut artifact = artifact;
        if let Some((layout, fragments)) = encoded {
            tracing::debug!("Encoded {} frame(s) as {}", fragments.len(), scheme);
            artifact.dataset.insert(Element::new(
                tags::PIXEL_DATA,
                Vr::OB,
                Value::Encapsulated {
                    offset_table: Vec::new(),
                    fragments,
                },
            ));
            if let Some(photometric) = codec.photometric_interpretation(&layout) {
                artifact
                    .dataset
                    .put_text(tags::PHOTOMETRIC_INTERPRETATION, Vr::CS, photometric);
            }
            // JPEG family codestreams carry their own component layout.
            if layout.samples_per_pixel > 1 && scheme != CompressionScheme::Rle {
                artifact.dataset.put_u16(tags::PLANAR_CONFIGURATION, 0);
            }
        }
        if scheme.is_lossy() {
            artifact
                .dataset
                .put_text(tags::LOSSY_IMAGE_COMPRESSION, Vr::CS, "01");
            artifact
                .dataset
                .put_text(tags::LOSSY_IMAGE_COMPRESSION_METHOD, Vr::CS, "ISO_10918_1");
        }
        artifact.set_transfer_syntax(target);
        Ok(artifact)
    }
}

fn encode_frames(
    codec: &dyn PixelCodec,
    dataset: &DataSet,
    pixel_data: &Element,
) -> Result<(FrameLayout, Vec<Vec<u8>>), ConversionError> {
    let native = pixel_data.bytes().ok_or_else(|| {
        ConversionError::InvalidPixelData("expected native pixel data".to_string())
    })?;

    let layout = frame_layout(dataset)?;
    let frame_len = layout.frame_len();
    if frame_len == 0 {
        return Err(ConversionError::InvalidPixelData(format!(
            "empty frame ({}x{}, {} bits)",
            layout.rows, layout.columns, layout.bits_allocated
        )));
    }

    let frames = match dataset.int_string(tags::NUMBER_OF_FRAMES) {
        None => 1,
        Some(n) if n >= 1 => usize::try_from(n).map_err(|_| {
            ConversionError::InvalidPixelData(format!("number of frames {} is out of range", n))
        })?,
        Some(n) => {
            return Err(ConversionError::InvalidPixelData(format!(
                "number of frames is {}",
                n
            )));
        }
    };

    let needed = frame_len.checked_mul(frames).ok_or_else(|| {
        ConversionError::InvalidPixelData(format!(
            "{} frame(s) of {} bytes overflow the address space",
            frames, frame_len
        ))
    })?;
    if native.len() < needed {
        return Err(ConversionError::InvalidPixelData(format!(
            "{} bytes of pixel data for {} frame(s) of {} bytes",
            native.len(),
            frames,
            frame_len
        )));
    }

    let fragments = native[..needed]
        .chunks_exact(frame_len)
        .map(|frame| codec.encode_frame(&layout, frame).map_err(ConversionError::from))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((layout, fragments))
}

fn frame_layout(dataset: &DataSet) -> Result<FrameLayout, ConversionError> {
    let required = |tag: Tag| dataset.u16(tag).ok_or(ConversionError::MissingAttribute(tag));
    let bits_allocated = required(tags::BITS_ALLOCATED)?;
    Ok(FrameLayout {
        rows: required(tags::ROWS)?,
        columns: required(tags::COLUMNS)?,
        bits_allocated,
        bits_stored: dataset.u16(tags::BITS_STORED).unwrap_or(bits_allocated),
        pixel_representation: dataset.u16(tags::PIXEL_REPRESENTATION).unwrap_or(0),
        samples_per_pixel: dataset.u16(tags::SAMPLES_PER_PIXEL).unwrap_or(1),
        planar_configuration: dataset.u16(tags::PLANAR_CONFIGURATION).unwrap_or(0),
    })
}
