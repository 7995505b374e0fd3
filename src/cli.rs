//! Command-line surface.
//!
//! ```text
//! dcmsend [-compress <scheme>] [-keep] [-fix1251] <input-file> <host> <port> <local-ae> <remote-ae>
//! dcmsend -folder <dir> [-compress <scheme>] [-keep] [-fix1251] <host> <port> <local-ae> <remote-ae>
//! ```
//!
//! The historical single-dash long flags are accepted alongside the usual
//! `--flag` spelling.

use crate::config::Settings;
use crate::models::{CharsetError, CompressionScheme, TransferConfig};
use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;

const LEGACY_FLAGS: &[&str] = &["-folder", "-compress", "-keep", "-fix1251"];

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dcmsend",
    version,
    about = "Convert DICOM files and send them to a Storage SCP"
)]
pub struct Args {
    /// Send every matching file under this folder instead of a single file
    #[arg(long, value_name = "DIR")]
    pub folder: Option<Utf8PathBuf>,

    /// Compress pixel data before sending: jpeg, jpeg2000, jpegls or rle
    #[arg(long, value_name = "SCHEME")]
    pub compress: Option<String>,

    /// Keep source files after a successful transfer
    #[arg(long)]
    pub keep: bool,

    /// Re-encode windows-1251 text as UTF-8
    #[arg(long = "fix1251")]
    pub fix1251: bool,

    /// Settings file (defaults to ./dcmsend.yaml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Log at debug level
    #[arg(long)]
    pub debug: bool,

    /// Do not log to the console
    #[arg(long)]
    pub quiet: bool,

    /// [<input-file>] <host> <port> <local-ae> <remote-ae>
    #[arg(value_name = "ARGS", num_args = 4..=5, required = true)]
    pub positional: Vec<String>,
}

/// What to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    SingleFile(Utf8PathBuf),
    Folder(Utf8PathBuf),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    #[error("expected <input-file> <host> <port> <local-ae> <remote-ae>, got {0} argument(s)")]
    SingleFileArguments(usize),

    #[error("with -folder, expected <host> <port> <local-ae> <remote-ae>, got {0} argument(s)")]
    FolderArguments(usize),

    #[error("invalid port {0:?}")]
    Port(String),

    #[error(transparent)]
    Charset(#[from] CharsetError),
}

/// Parsed invocation: the mode plus the configuration every file shares.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub mode: Mode,
    pub config: TransferConfig,
}

/// Rewrite legacy single-dash long flags to their `--` form.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            if LEGACY_FLAGS.contains(&arg.as_str()) {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

impl Args {
    /// Parse the process arguments, accepting legacy flags.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args()))
    }

    pub fn try_parse_normalized<I>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = String>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// Requested compression. Unrecognised names mean no compression.
    pub fn compression(&self) -> Option<CompressionScheme> {
        let value = self.compress.as_deref()?;
        let scheme = CompressionScheme::from_cli_value(value);
        if scheme.is_none() {
            tracing::warn!("Unknown compression {:?}, sending without compression", value);
        }
        scheme
    }

    /// Combine the arguments with `settings` into one invocation.
    pub fn invocation(&self, settings: &Settings) -> Result<Invocation, UsageError> {
        let (mode, destination) = match &self.folder {
            Some(folder) => {
                if self.positional.len() != 4 {
                    return Err(UsageError::FolderArguments(self.positional.len()));
                }
                (Mode::Folder(folder.clone()), &self.positional[..])
            }
            None => {
                if self.positional.len() != 5 {
                    return Err(UsageError::SingleFileArguments(self.positional.len()));
                }
                (
                    Mode::SingleFile(Utf8PathBuf::from(&self.positional[0])),
                    &self.positional[1..],
                )
            }
        };

        let port: u16 = destination[1]
            .parse()
            .map_err(|_| UsageError::Port(destination[1].clone()))?;

        let mut config = TransferConfig::new(&destination[0], port, &destination[2], &destination[3]);
        config.compression = self.compression();
        config.delete_after_send = !self.keep;
        config.reencode_text = self.fix1251;
        config.charset = settings.charset_pair()?;
        config.network = settings.network();
        config.file_pattern = settings.file_pattern.clone();

        Ok(Invocation { mode, config })
    }
}
