use crate::dicom::part10;
use crate::models::{PipelineResult, PipelineStatus, TransferConfig};
use crate::services::converter::FileConverter;
use crate::services::transfer::TransferClient;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Removing a source file after a successful transfer failed
#[derive(Error, Debug)]
#[error("Failed to delete {path}: {source}")]
pub struct DeleteError {
    pub path: Utf8PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Load, convert, send and (optionally) delete one file.
///
/// The source file is deleted only after the destination has accepted it and
/// only when the configuration asks for deletion. Nothing is ever written
/// back to the source.
#[derive(Clone)]
pub struct FilePipeline {
    converter: FileConverter,
    client: TransferClient,
    config: Arc<TransferConfig>,
}

impl FilePipeline {
    pub fn new(converter: FileConverter, client: TransferClient, config: Arc<TransferConfig>) -> Self {
        Self {
            converter,
            client,
            config,
        }
    }

    /// Pipeline with the built-in codecs and the DIMSE transport
    pub fn with_defaults(config: Arc<TransferConfig>) -> Self {
        Self::new(FileConverter::default(), TransferClient::default(), config)
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Run the whole pipeline for `path`. Never fails: every problem ends up
    /// in the returned result.
    pub async fn run(&self, path: &Utf8Path) -> PipelineResult {
        let start = Instant::now();
        let fail = |status: PipelineStatus, message: String| {
            tracing::error!("{}: {}", path, message);
            PipelineResult::failed(path.to_path_buf(), status, message, start.elapsed())
        };

        tracing::debug!("Loading {}", path);
        let artifact = match part10::load_file(path).await {
            Ok(artifact) => artifact,
            Err(e) => return fail(PipelineStatus::LoadFailed, e.to_string()),
        };

        let converted = match self.converter.convert(artifact, &self.config) {
            Ok(converted) => converted,
            Err(e) => return fail(PipelineStatus::ConversionFailed, e.to_string()),
        };

        if !self.client.send(&converted, &self.config).await {
            return fail(
                PipelineStatus::TransferFailed,
                format!("{} did not accept the file", self.config.destination()),
            );
        }

        let deleted = if self.config.delete_after_send {
            match delete_source(path).await {
                Ok(()) => {
                    tracing::debug!("Deleted {}", path);
                    true
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    false
                }
            }
        } else {
            false
        };

        PipelineResult::sent(path.to_path_buf(), deleted, start.elapsed())
    }

    /// Run the pipeline on its own task. A panic anywhere inside becomes a
    /// `Crashed` result instead of taking the caller down with it.
    pub async fn run_isolated(self: &Arc<Self>, path: Utf8PathBuf) -> PipelineResult {
        let pipeline = Arc::clone(self);
        let task_path = path.clone();
        match tokio::spawn(async move { pipeline.run(&task_path).await }).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Task for {} ended abnormally: {}", path, e);
                PipelineResult::failed(path, PipelineStatus::Crashed, e.to_string(), Duration::ZERO)
            }
        }
    }
}

async fn delete_source(path: &Utf8Path) -> Result<(), DeleteError> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|source| DeleteError {
            path: path.to_path_buf(),
            source,
        })
}
