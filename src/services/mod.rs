//! Services module - conversion and delivery of DICOM files.
//!
//! Everything here is independent of the command line, so the same pipeline
//! can be driven by the binary, by tests, or by another front end.
//!
//! # Components
//!
//! - [`CharsetReencoder`]: repairs legacy single-byte text (windows-1251 by
//!   default) by re-encoding every text-bearing element, including those
//!   nested in sequences, and declaring the new encoding. Failing elements
//!   keep their bytes.
//!
//! - [`ArtifactTranscoder`]: re-encodes native pixel data into a compressed
//!   transfer syntax through a [`CodecRegistry`] of
//!   [`PixelCodec`](crate::dicom::PixelCodec)s.
//!
//! - [`FileConverter`]: applies transcoding then re-encoding according to the
//!   [`TransferConfig`](crate::models::TransferConfig) and hands out a
//!   read-only [`ConvertedArtifact`].
//!
//! - [`TransferClient`]: sends a converted artifact through a
//!   [`StoreTransport`] and reduces the outcome to accept / not accept.
//!   [`DimseTransport`] is the C-STORE implementation.
//!
//! - [`FilePipeline`]: load, convert, send, delete for a single file.
//!
//! - [`BatchRunner`]: runs the pipeline over a folder, isolating each file
//!   in its own task so a crash is counted as a failure.
//!
//! # Usage Example
//!
//! ```ignore
//! use dcmsend::models::TransferConfig;
//! use dcmsend::services::{BatchRunner, FilePipeline};
//! use camino::Utf8Path;
//! use std::sync::Arc;
//!
//! let config = Arc::new(TransferConfig::new("pacs.local", 104, "DCMSEND", "PACS"));
//! let pipeline = Arc::new(FilePipeline::with_defaults(config));
//! let report = BatchRunner::new(pipeline).run_folder(Utf8Path::new("/data/export")).await?;
//! println!("{}", report.tally);
//! ```

pub mod batch;
pub mod charset;
pub mod converter;
pub mod pipeline;
pub mod transcode;
pub mod transfer;

pub use batch::{BatchError, BatchReport, BatchRunner, run_folder};
pub use charset::{CharsetReencoder, ElementEncodingError, ReencodeReport, Reencoded};
pub use converter::{ConvertedArtifact, FileConverter};
pub use pipeline::{DeleteError, FilePipeline};
pub use transcode::{ArtifactTranscoder, CodecRegistry, ConversionError};
pub use transfer::{DimseTransport, StoreOutcome, StoreTransport, TransferClient, TransferError};
