//! dcmsend - batch DICOM converter and sender
//!
//! Main entry point for the command-line tool.
//!
//! # Execution Flow
//!
//! 1. Parse arguments (legacy `-flag` spellings are accepted)
//! 2. Load settings: defaults, then `dcmsend.yaml` (or `--config`), then
//!    `DCMSEND_*` environment variables
//! 3. Initialize logging → `<log_dir>/dcmsend.<date>` plus console on stderr
//! 4. Build the transfer configuration and validate AE titles, host and port
//! 5. Run the single-file pipeline or the folder batch on a tokio runtime
//!
//! # Exit Codes
//!
//! - `0`: single file sent, or any folder run (see the printed summary)
//! - `1`: single file not sent, or a startup failure
//! - `2`: invalid command line

use anyhow::{Context, Result};
use camino::Utf8Path;
use dcmsend::cli::{Args, Mode};
use dcmsend::config::validate_transfer_config;
use dcmsend::{APP_NAME, BatchRunner, BatchTally, ConfigManager, FilePipeline, VERSION};
use std::process::ExitCode;
use std::sync::Arc;

const WORKER_THREADS: usize = 2;

fn main() -> ExitCode {
    let args = Args::parse_normalized();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config_manager = match &args.config {
        Some(path) => ConfigManager::new(path),
        None => ConfigManager::default(),
    };
    let settings = config_manager.load_settings()?;

    let _guard = dcmsend::logging::setup_logging_with_console(
        Utf8Path::new(&settings.log_dir),
        APP_NAME,
        args.debug || settings.debug,
        !args.quiet,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    if !config_manager.has_settings_file() {
        tracing::debug!(
            "Settings file {} not found, using defaults",
            config_manager.settings_path()
        );
    }

    let invocation = match args.invocation(&settings) {
        Ok(invocation) => invocation,
        Err(e) => return Ok(usage_error(&e)),
    };
    if let Err(e) = validate_transfer_config(&invocation.config) {
        return Ok(usage_error(&e));
    }

    let config = Arc::new(invocation.config);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("dcmsend-worker")
        .build()
        .context("Failed to start async runtime")?;

    let pipeline = Arc::new(FilePipeline::with_defaults(config));

    let code = match invocation.mode {
        Mode::SingleFile(path) => {
            let result = runtime.block_on(pipeline.run_isolated(path));
            if result.success {
                println!("{} sent.", result.path);
                ExitCode::SUCCESS
            } else {
                println!(
                    "{} not sent: {}",
                    result.path,
                    result.message.as_deref().unwrap_or("unknown error")
                );
                ExitCode::FAILURE
            }
        }
        Mode::Folder(root) => {
            let tally = match runtime.block_on(BatchRunner::new(pipeline).run_folder(&root)) {
                Ok(report) => report.tally,
                Err(e) => {
                    tracing::error!("{}", e);
                    BatchTally::new()
                }
            };
            println!("{}", tally);
            ExitCode::SUCCESS
        }
    };

    tracing::info!("Done");
    Ok(code)
}

fn usage_error(error: &dyn std::fmt::Display) -> ExitCode {
    tracing::error!("{}", error);
    eprintln!("error: {}", error);
    ExitCode::from(2)
}
