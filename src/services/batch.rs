use crate::models::{BatchTally, PipelineResult, TransferConfig};
use crate::services::pipeline::FilePipeline;
use camino::{Utf8Path, Utf8PathBuf};
use glob::MatchOptions;
use std::sync::Arc;
use thiserror::Error;

/// Errors that prevent a folder run from starting
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Folder not found: {0}")]
    FolderNotFound(Utf8PathBuf),

    #[error("Not a folder: {0}")]
    NotAFolder(Utf8PathBuf),

    #[error("Invalid file pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Totals and per-file results of one folder run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub tally: BatchTally,
    pub results: Vec<PipelineResult>,
}

/// Runs the single-file pipeline over every matching file under a folder,
/// one file at a time.
pub struct BatchRunner {
    pipeline: Arc<FilePipeline>,
}

impl BatchRunner {
    pub fn new(pipeline: Arc<FilePipeline>) -> Self {
        Self { pipeline }
    }

    /// Recursively list files under `root` whose names match `pattern`
    /// (case-insensitive), in sorted order.
    pub fn discover(root: &Utf8Path, pattern: &str) -> Result<Vec<Utf8PathBuf>, BatchError> {
        if !root.exists() {
            return Err(BatchError::FolderNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(BatchError::NotAFolder(root.to_path_buf()));
        }

        let full_pattern = format!("{}/**/{}", glob::Pattern::escape(root.as_str()), pattern);
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let entries = glob::glob_with(&full_pattern, options).map_err(|source| BatchError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => match Utf8PathBuf::from_path_buf(path) {
                    Ok(path) => files.push(path),
                    Err(path) => tracing::warn!("Skipping non UTF-8 path: {}", path.display()),
                },
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable entry: {}", e),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Process every file under `root`.
    ///
    /// A failing or crashing file is counted and the run continues. An empty
    /// folder is not an error.
    pub async fn run_folder(&self, root: &Utf8Path) -> Result<BatchReport, BatchError> {
        let files = Self::discover(root, &self.pipeline.config().file_pattern)?;
        let mut tally = BatchTally::new();
        let mut results = Vec::with_capacity(files.len());

        if files.is_empty() {
            tracing::info!(
                "No files matching {} in {}",
                self.pipeline.config().file_pattern,
                root
            );
            return Ok(BatchReport { tally, results });
        }

        let total = files.len();
        tracing::info!(
            "Sending {} files from {} to {}",
            total,
            root,
            self.pipeline.config().destination()
        );

        for (index, path) in files.into_iter().enumerate() {
            tracing::info!("[{}/{}] {}", index + 1, total, path);

            let result = self.pipeline.run_isolated(path).await;

            if result.success {
                tracing::info!(
                    "[{}/{}] {} sent{}",
                    index + 1,
                    total,
                    result.path,
                    if result.source_deleted { " and deleted" } else { "" }
                );
            } else {
                tracing::warn!(
                    "[{}/{}] {} {}: {}",
                    index + 1,
                    total,
                    result.path,
                    result.status,
                    result.message.as_deref().unwrap_or("")
                );
            }
            tally.record(&result);
            results.push(result);
        }

        tally.log_summary();
        Ok(BatchReport { tally, results })
    }
}

/// Run a folder with the default pipeline for `config`.
pub async fn run_folder(
    root: &Utf8Path,
    config: Arc<TransferConfig>,
) -> Result<BatchReport, BatchError> {
    let pipeline = Arc::new(FilePipeline::with_defaults(config));
    BatchRunner::new(pipeline).run_folder(root).await
}
