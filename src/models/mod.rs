//! Data models for dcmsend.
//!
//! - [`Artifact`]: one loaded DICOM file (file meta plus data set)
//! - [`TransferConfig`]: immutable run configuration built at startup
//! - [`PipelineResult`]: per-file outcome produced by the pipeline
//! - [`BatchTally`]: running counters owned by the batch runner

pub mod artifact;
pub mod tally;
pub mod transfer;

pub use artifact::{Artifact, DataSet, Element, Tag, Value, Vr, tags};
pub use tally::BatchTally;
pub use transfer::{
    CharsetError, CharsetPair, CompressionScheme, NetworkSettings, PipelineResult,
    PipelineStatus, TransferConfig, UNIVERSAL_TERM,
};
