use crate::dicom::uids;
use camino::Utf8PathBuf;
use encoding_rs::Encoding;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Target pixel-data compression selected with `-compress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionScheme {
    Jpeg,
    Jpeg2000,
    JpegLs,
    Rle,
}

impl CompressionScheme {
    /// Parse the command-line value. Unrecognised values mean "no compression".
    pub fn from_cli_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpeg" => Some(Self::Jpeg),
            "jpeg2000" => Some(Self::Jpeg2000),
            "jpegls" => Some(Self::JpegLs),
            "rle" => Some(Self::Rle),
            _ => None,
        }
    }

    pub fn transfer_syntax_uid(self) -> &'static str {
        match self {
            Self::Jpeg => uids::JPEG_BASELINE,
            Self::Jpeg2000 => uids::JPEG_2000_LOSSLESS,
            Self::JpegLs => uids::JPEG_LS_LOSSLESS,
            Self::Rle => uids::RLE_LOSSLESS,
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Jpeg2000 => "jpeg2000",
            Self::JpegLs => "jpegls",
            Self::Rle => "rle",
        }
    }
}

impl fmt::Display for CompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CharsetError {
    #[error("Unknown character encoding label: {0}")]
    UnknownLabel(String),

    #[error("Encoding {0} has no DICOM Specific Character Set term")]
    NoDefinedTerm(String),
}

/// Source and target encodings for legacy text repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharsetPair {
    pub source: &'static Encoding,
    pub target: &'static Encoding,
}

impl CharsetPair {
    pub fn new(source: &'static Encoding, target: &'static Encoding) -> Self {
        Self { source, target }
    }

    /// Resolve WHATWG encoding labels (e.g. `windows-1251`, `utf-8`).
    ///
    /// The target must have a Specific Character Set defined term, otherwise
    /// the re-encoded bytes could not be declared.
    pub fn from_labels(source: &str, target: &str) -> Result<Self, CharsetError> {
        let source = Encoding::for_label(source.trim().as_bytes())
            .ok_or_else(|| CharsetError::UnknownLabel(source.to_string()))?;
        let target = Encoding::for_label(target.trim().as_bytes())
            .ok_or_else(|| CharsetError::UnknownLabel(target.to_string()))?;
        if defined_term(target).is_none() {
            return Err(CharsetError::NoDefinedTerm(target.name().to_string()));
        }
        Ok(Self { source, target })
    }

    /// Specific Character Set value declaring the target encoding.
    pub fn target_term(&self) -> &'static str {
        defined_term(self.target).unwrap_or(UNIVERSAL_TERM)
    }
}

impl Default for CharsetPair {
    fn default() -> Self {
        Self {
            source: encoding_rs::WINDOWS_1251,
            target: encoding_rs::UTF_8,
        }
    }
}

/// Specific Character Set term for Unicode in UTF-8.
pub const UNIVERSAL_TERM: &str = "ISO_IR 192";

/// Map an encoding to its DICOM Specific Character Set defined term.
pub fn defined_term(encoding: &'static Encoding) -> Option<&'static str> {
    let term = match encoding.name() {
        "UTF-8" => UNIVERSAL_TERM,
        "windows-1252" => "ISO_IR 100",
        "ISO-8859-2" => "ISO_IR 101",
        "ISO-8859-3" => "ISO_IR 109",
        "ISO-8859-4" => "ISO_IR 110",
        "ISO-8859-5" => "ISO_IR 144",
        "ISO-8859-6" => "ISO_IR 127",
        "ISO-8859-7" => "ISO_IR 126",
        "ISO-8859-8" => "ISO_IR 138",
        "windows-1254" => "ISO_IR 148",
        "windows-874" => "ISO_IR 166",
        "GBK" => "GBK",
        "gb18030" => "GB18030",
        _ => return None,
    };
    Some(term)
}

/// Association tuning shared by every transfer in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub max_pdu_length: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(60),
            max_pdu_length: 16384,
        }
    }
}

/// Immutable run configuration, built once from the command line and settings.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub host: String,
    pub port: u16,
    /// Calling AE title.
    pub local_ae: String,
    /// Called AE title.
    pub remote_ae: String,
    pub compression: Option<CompressionScheme>,
    pub delete_after_send: bool,
    pub reencode_text: bool,
    pub charset: CharsetPair,
    pub network: NetworkSettings,
    /// Folder-mode file name filter.
    pub file_pattern: String,
}

impl TransferConfig {
    /// Configuration with the command-line defaults: no compression, delete
    /// on success, no text repair.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        local_ae: impl Into<String>,
        remote_ae: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            local_ae: local_ae.into(),
            remote_ae: remote_ae.into(),
            compression: None,
            delete_after_send: true,
            reencode_text: false,
            charset: CharsetPair::default(),
            network: NetworkSettings::default(),
            file_pattern: "*.dcm".to_string(),
        }
    }

    /// Host without the brackets of a bracketed IPv6 literal
    pub fn host_name(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|host| host.strip_suffix(']'))
            .unwrap_or(&self.host)
    }

    /// `host:port` for display, with IPv6 literals in brackets
    pub fn destination(&self) -> String {
        let host = self.host_name();
        if host.contains(':') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

/// Terminal state of a single-file pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Sent,
    LoadFailed,
    ConversionFailed,
    TransferFailed,
    /// The file's task died unexpectedly.
    Crashed,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Sent => "sent",
            Self::LoadFailed => "load failed",
            Self::ConversionFailed => "conversion failed",
            Self::TransferFailed => "transfer failed",
            Self::Crashed => "crashed",
        };
        f.write_str(text)
    }
}

/// Outcome of one file.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub path: Utf8PathBuf,
    pub success: bool,
    pub message: Option<String>,
    pub status: PipelineStatus,
    pub source_deleted: bool,
    pub duration: Duration,
}

impl PipelineResult {
    pub fn sent(path: Utf8PathBuf, source_deleted: bool, duration: Duration) -> Self {
        Self {
            path,
            success: true,
            message: None,
            status: PipelineStatus::Sent,
            source_deleted,
            duration,
        }
    }

    pub fn failed(
        path: Utf8PathBuf,
        status: PipelineStatus,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            path,
            success: false,
            message: Some(message.into()),
            status,
            source_deleted: false,
            duration,
        }
    }
}
