pub mod validation;

use crate::models::{CharsetError, CharsetPair, NetworkSettings};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

pub use validation::{ValidationError, validate_ae_title, validate_transfer_config};

/// Tunables that are not part of the command line.
///
/// Every field has a default, so an absent or partial settings file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Encoding label of legacy text repaired by `-fix1251`
    pub source_charset: String,

    /// Encoding label written by `-fix1251`
    pub target_charset: String,

    pub connect_timeout_secs: u64,
    pub response_timeout_secs: u64,

    /// Largest P-DATA PDU we accept; 0 means unlimited
    pub max_pdu_length: u32,

    /// File name pattern for folder mode
    pub file_pattern: String,

    pub log_dir: String,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let network = NetworkSettings::default();
        Self {
            source_charset: "windows-1251".to_string(),
            target_charset: "utf-8".to_string(),
            connect_timeout_secs: network.connect_timeout.as_secs(),
            response_timeout_secs: network.response_timeout.as_secs(),
            max_pdu_length: network.max_pdu_length,
            file_pattern: "*.dcm".to_string(),
            log_dir: "logs".to_string(),
            debug: false,
        }
    }
}

impl Settings {
    pub fn network(&self) -> NetworkSettings {
        NetworkSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            response_timeout: Duration::from_secs(self.response_timeout_secs),
            max_pdu_length: self.max_pdu_length,
        }
    }

    pub fn charset_pair(&self) -> Result<CharsetPair, CharsetError> {
        CharsetPair::from_labels(&self.source_charset, &self.target_charset)
    }
}

/// Loads and saves [`Settings`].
///
/// Sources are layered with the `config` crate, later ones winning:
/// built-in defaults, the YAML settings file (optional), then `DCMSEND_*`
/// environment variables (e.g. `DCMSEND_MAX_PDU_LENGTH=65536`).
#[derive(Debug, Clone)]
pub struct ConfigManager {
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    pub const DEFAULT_FILE: &'static str = "dcmsend.yaml";
    pub const ENV_PREFIX: &'static str = "DCMSEND";

    pub fn new<P: AsRef<Utf8Path>>(settings_path: P) -> Self {
        Self {
            settings_path: settings_path.as_ref().to_path_buf(),
        }
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Whether a settings file is present. Without one, defaults and
    /// environment overrides apply.
    pub fn has_settings_file(&self) -> bool {
        self.settings_path.is_file()
    }

    pub fn load_settings(&self) -> Result<Settings> {
        let defaults = ::config::Config::try_from(&Settings::default())
            .context("Failed to build default settings")?;

        let settings: Settings = ::config::Config::builder()
            .add_source(defaults)
            .add_source(
                ::config::File::from(self.settings_path.as_std_path())
                    .format(::config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(::config::Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create settings directory: {}", parent))?;
            }
        }

        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FILE)
    }
}
