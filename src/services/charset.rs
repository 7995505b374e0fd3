use crate::dicom::dictionary;
use crate::models::{Artifact, CharsetPair, DataSet, Tag, Value, Vr, tags};
use thiserror::Error;

/// Non-ASCII punctuation accepted in text that arrived as UN
const TEXT_PUNCTUATION: &str = "«»–—№…“”„‘’°±·";

/// A single text element that could not be re-encoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElementEncodingError {
    #[error("{tag}: bytes are not valid {encoding}")]
    Decode { tag: Tag, encoding: &'static str },

    #[error("{tag}: text cannot be represented in {encoding}")]
    Encode { tag: Tag, encoding: &'static str },
}

/// Per-artifact counts from a re-encoding pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReencodeReport {
    pub converted: usize,
    pub unchanged: usize,
    pub failures: Vec<ElementEncodingError>,
}

/// An artifact whose text has been re-encoded.
///
/// Callers outside this crate get the report but never the artifact, so the
/// re-encoded bytes cannot be handed back to a reencoder and read under the
/// stale source encoding.
///
/// ```compile_fail
/// use dcmsend::models::{Artifact, CharsetPair};
/// use dcmsend::services::CharsetReencoder;
///
/// fn twice(artifact: Artifact) {
///     let reencoder = CharsetReencoder::new(CharsetPair::default());
///     let once = reencoder.reencode(artifact);
///     reencoder.reencode(once.artifact().clone());
/// }
/// ```
#[derive(Debug)]
pub struct Reencoded {
    artifact: Artifact,
    report: ReencodeReport,
}

impl Reencoded {
    #[cfg(test)]
    fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn report(&self) -> &ReencodeReport {
        &self.report
    }

    pub(crate) fn into_parts(self) -> (Artifact, ReencodeReport) {
        (self.artifact, self.report)
    }
}

/// Reinterprets legacy single-byte text elements under a new encoding.
#[derive(Debug, Clone, Copy)]
pub struct CharsetReencoder {
    charset: CharsetPair,
}

impl CharsetReencoder {
    pub fn new(charset: CharsetPair) -> Self {
        Self { charset }
    }

    /// Re-encode every text-bearing element (including those nested in
    /// sequences) and declare the target encoding in Specific Character Set.
    ///
    /// Elements that fail conversion keep their original bytes.
    pub fn reencode(&self, mut artifact: Artifact) -> Reencoded {
        let mut report = ReencodeReport::default();
        self.reencode_set(&mut artifact.dataset, &mut report);

        artifact
            .dataset
            .put_text(tags::SPECIFIC_CHARACTER_SET, Vr::CS, self.charset.target_term());

        tracing::debug!(
            "Re-encoded text {} -> {}: {} converted, {} unchanged, {} failed",
            self.charset.source.name(),
            self.charset.target.name(),
            report.converted,
            report.unchanged,
            report.failures.len()
        );

        Reencoded { artifact, report }
    }

    fn reencode_set(&self, set: &mut DataSet, report: &mut ReencodeReport) {
        for element in set.iter_mut() {
            let (tag, vr) = (element.tag, element.vr);
            match &mut element.value {
                Value::Sequence(items) => {
                    for item in items.iter_mut() {
                        self.reencode_set(item, report);
                    }
                }
                Value::Bytes(bytes) if self.holds_text(tag, vr, bytes) => {
                    match self.reencode_bytes(tag, bytes) {
                        Ok(Some(converted)) => {
                            *bytes = converted;
                            report.converted += 1;
                        }
                        Ok(None) => report.unchanged += 1,
                        Err(e) => {
                            tracing::warn!("Leaving element unchanged: {}", e);
                            report.failures.push(e);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn holds_text(&self, tag: Tag, vr: Vr, bytes: &[u8]) -> bool {
        if vr != Vr::UN {
            return vr.is_charset_text();
        }
        match dictionary::lookup(tag) {
            Some(known) => known.is_charset_text(),
            None => self.looks_like_text(bytes),
        }
    }

    /// Guess whether an unknown UN value is legacy text: printable bytes,
    /// at least one of them above ASCII, decoding cleanly to letters or
    /// common punctuation. Plain ASCII needs no conversion and is skipped.
    pub fn looks_like_text(&self, bytes: &[u8]) -> bool {
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let text = &bytes[..end];
        if !text.iter().any(|&b| b >= 0x80) {
            return false;
        }
        if text
            .iter()
            .any(|&b| b == 0x7F || (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C)))
        {
            return false;
        }
        let (decoded, had_errors) = self.charset.source.decode_without_bom_handling(text);
        !had_errors
            && decoded
                .chars()
                .filter(|c| !c.is_ascii())
                .all(|c| c.is_alphabetic() || TEXT_PUNCTUATION.contains(c))
    }

    /// Convert one element's bytes.
    ///
    /// Returns `Ok(None)` when the converted bytes equal the input.
    pub fn reencode_bytes(
        &self,
        tag: Tag,
        bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, ElementEncodingError> {
        let (text, had_errors) = self.charset.source.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(ElementEncodingError::Decode {
                tag,
                encoding: self.charset.source.name(),
            });
        }

        let (encoded, _, unmappable) = self.charset.target.encode(&text);
        if unmappable {
            return Err(ElementEncodingError::Encode {
                tag,
                encoding: self.charset.target.name(),
            });
        }

        let mut converted = encoded.into_owned();
        if converted.len() % 2 == 1 {
            converted.push(b' ');
        }
        if converted == bytes {
            Ok(None)
        } else {
            Ok(Some(converted))
        }
    }
}
