//! Integration tests for ConfigManager and settings file handling
//!
//! These tests verify:
//! - Defaults when no settings file exists
//! - Loading partial YAML files over the defaults
//! - Saving and reloading settings
//! - Settings flowing into the transfer configuration

use camino::Utf8PathBuf;
use dcmsend::cli::{Args, Mode};
use dcmsend::config::{ConfigManager, Settings};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_missing_file_gives_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(config_path.join("dcmsend.yaml"));

    let settings = manager.load_settings().unwrap();

    assert!(!manager.has_settings_file());
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.source_charset, "windows-1251");
    assert_eq!(settings.file_pattern, "*.dcm");
    assert_eq!(settings.max_pdu_length, 16384);
}

#[test]
fn test_partial_file_overrides_only_its_keys() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let settings_path = config_path.join("site.yaml");
    fs::write(
        &settings_path,
        "max_pdu_length: 65536\nresponse_timeout_secs: 5\nfile_pattern: \"*.DCM\"\n",
    )
    .unwrap();

    let manager = ConfigManager::new(&settings_path);
    let settings = manager.load_settings().unwrap();

    assert!(manager.has_settings_file());
    assert_eq!(settings.max_pdu_length, 65536);
    assert_eq!(settings.response_timeout_secs, 5);
    assert_eq!(settings.file_pattern, "*.DCM");
    assert_eq!(settings.connect_timeout_secs, Settings::default().connect_timeout_secs);
    assert_eq!(settings.target_charset, "utf-8");
}

#[test]
fn test_save_and_load_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(config_path.join("nested").join("dcmsend.yaml"));

    let settings = Settings {
        source_charset: "koi8-r".to_string(),
        debug: true,
        log_dir: "var/log".to_string(),
        ..Settings::default()
    };
    manager.save_settings(&settings).unwrap();

    assert!(manager.settings_path().exists());
    assert_eq!(manager.load_settings().unwrap(), settings);
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let settings_path = config_path.join("broken.yaml");
    fs::write(&settings_path, "max_pdu_length: [not, a, number]\n").unwrap();

    assert!(ConfigManager::new(&settings_path).load_settings().is_err());
}

#[test]
fn test_settings_reach_transfer_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let settings_path = config_path.join("dcmsend.yaml");
    fs::write(
        &settings_path,
        "connect_timeout_secs: 3\nsource_charset: koi8-r\n",
    )
    .unwrap();
    let settings = ConfigManager::new(&settings_path).load_settings().unwrap();

    let args = Args::try_parse_normalized(
        ["dcmsend", "-folder", "in", "-fix1251", "pacs", "104", "ME", "PACS"]
            .into_iter()
            .map(String::from),
    )
    .unwrap();
    let invocation = args.invocation(&settings).unwrap();

    assert_eq!(invocation.mode, Mode::Folder("in".into()));
    assert_eq!(invocation.config.network.connect_timeout, Duration::from_secs(3));
    assert_eq!(invocation.config.charset.source, encoding_rs::KOI8_R);
    assert_eq!(invocation.config.charset.target, encoding_rs::UTF_8);
}

#[test]
fn test_unknown_charset_is_a_usage_error() {
    let settings = Settings {
        source_charset: "no-such-encoding".to_string(),
        ..Settings::default()
    };
    let args = Args::try_parse_normalized(
        ["dcmsend", "a.dcm", "pacs", "104", "ME", "PACS"]
            .into_iter()
            .map(String::from),
    )
    .unwrap();

    assert!(args.invocation(&settings).is_err());
}
