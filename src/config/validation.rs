// Checks on user-supplied transfer parameters, run before any file is
// touched so a typo fails the whole invocation instead of every file.

use crate::models::TransferConfig;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Default character repertoire without backslash or control characters.
static AE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x20-\x5B\x5D-\x7E]{1,16}$").expect("Invalid AE title regex"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid AE title {title:?}: {reason}")]
    AeTitle { title: String, reason: &'static str },

    #[error("Destination host is empty")]
    EmptyHost,

    #[error("Destination port must be between 1 and 65535")]
    Port,

    #[error("Maximum PDU length {0} is too small (use 0 for unlimited or at least 1024)")]
    PduLength(u32),

    #[error("File pattern is empty")]
    EmptyPattern,
}

pub fn validate_ae_title(title: &str) -> Result<(), ValidationError> {
    let invalid = |reason| ValidationError::AeTitle {
        title: title.to_string(),
        reason,
    };
    if title.trim().is_empty() {
        return Err(invalid("must not be blank"));
    }
    if !AE_TITLE.is_match(title) {
        return Err(invalid(
            "must be at most 16 printable characters without backslash",
        ));
    }
    Ok(())
}

pub fn validate_transfer_config(config: &TransferConfig) -> Result<(), ValidationError> {
    if config.host.trim().is_empty() {
        return Err(ValidationError::EmptyHost);
    }
    if config.port == 0 {
        return Err(ValidationError::Port);
    }
    validate_ae_title(&config.local_ae)?;
    validate_ae_title(&config.remote_ae)?;
    let max_pdu = config.network.max_pdu_length;
    if max_pdu != 0 && max_pdu < 1024 {
        return Err(ValidationError::PduLength(max_pdu));
    }
    if config.file_pattern.trim().is_empty() {
        return Err(ValidationError::EmptyPattern);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ae_titles() {
        assert!(validate_ae_title("STORESCP").is_ok());
        assert!(validate_ae_title("MY AE 01").is_ok());
        assert!(validate_ae_title("ABCDEFGHIJKLMNOP").is_ok());

        assert!(validate_ae_title("").is_err());
        assert!(validate_ae_title("    ").is_err());
        assert!(validate_ae_title("ABCDEFGHIJKLMNOPQ").is_err());
        assert!(validate_ae_title("BAD\\AE").is_err());
        assert!(validate_ae_title("TAB\tAE").is_err());
        assert!(validate_ae_title("ПАКС").is_err());
    }

    #[test]
    fn test_transfer_config_checks() {
        let good = TransferConfig::new("pacs", 104, "LOCAL", "REMOTE");
        assert_eq!(validate_transfer_config(&good), Ok(()));

        let mut config = good.clone();
        config.port = 0;
        assert_eq!(validate_transfer_config(&config), Err(ValidationError::Port));

        let mut config = good.clone();
        config.host = " ".to_string();
        assert_eq!(validate_transfer_config(&config), Err(ValidationError::EmptyHost));

        let mut config = good.clone();
        config.network.max_pdu_length = 100;
        assert_eq!(
            validate_transfer_config(&config),
            Err(ValidationError::PduLength(100))
        );

        let mut config = good;
        config.network.max_pdu_length = 0;
        assert_eq!(validate_transfer_config(&config), Ok(()));
    }
}
