use crate::models::{Artifact, CompressionScheme, TransferConfig, Vr, tags};
use crate::services::charset::{CharsetReencoder, ReencodeReport};
use crate::services::transcode::{ArtifactTranscoder, ConversionError};

/// An artifact that has been through the converter and is ready to send.
///
/// Read-only: the transfer step cannot alter what was converted.
#[derive(Debug, Clone)]
pub struct ConvertedArtifact {
    artifact: Artifact,
    transcoded: Option<CompressionScheme>,
    reencoded: Option<ReencodeReport>,
}

impl ConvertedArtifact {
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Scheme the pixel data was transcoded to, if any
    pub fn transcoded(&self) -> Option<CompressionScheme> {
        self.transcoded
    }

    /// Text re-encoding counts, if re-encoding ran
    pub fn reencoded(&self) -> Option<&ReencodeReport> {
        self.reencoded.as_ref()
    }

    /// Whether the artifact differs from what was loaded
    pub fn was_modified(&self) -> bool {
        self.transcoded.is_some() || self.reencoded.is_some()
    }
}

/// Applies the configured conversions: pixel transcoding first, then text
/// re-encoding. Either step may be a no-op.
#[derive(Debug, Clone, Default)]
pub struct FileConverter {
    transcoder: ArtifactTranscoder,
}

impl FileConverter {
    pub fn new(transcoder: ArtifactTranscoder) -> Self {
        Self { transcoder }
    }

    pub fn convert(
        &self,
        artifact: Artifact,
        config: &TransferConfig,
    ) -> Result<ConvertedArtifact, ConversionError> {
        let artifact = match config.compression {
            Some(scheme) => self.transcoder.transcode(artifact, Some(scheme))?,
            None => artifact,
        };

        let (mut artifact, reencoded) = if config.reencode_text {
            let (artifact, report) = CharsetReencoder::new(config.charset)
                .reencode(artifact)
                .into_parts();
            (artifact, Some(report))
        } else {
            (artifact, None)
        };

        let converted = config.compression.is_some() || reencoded.is_some();
        if converted {
            artifact.dataset.put_text(
                tags::SPECIFIC_CHARACTER_SET,
                Vr::CS,
                config.charset.target_term(),
            );
        }

        Ok(ConvertedArtifact {
            artifact,
            transcoded: config.compression,
            reencoded,
        })
    }
}
