//! Transfer syntax and protocol UIDs.

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

pub const JPEG_BASELINE: &str = "1.2.840.10008.1.2.4.50";
pub const JPEG_LS_LOSSLESS: &str = "1.2.840.10008.1.2.4.80";
pub const JPEG_2000_LOSSLESS: &str = "1.2.840.10008.1.2.4.90";
pub const RLE_LOSSLESS: &str = "1.2.840.10008.1.2.5";

pub const DICOM_APPLICATION_CONTEXT: &str = "1.2.840.10008.3.1.1.1";

pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.203897146391057731245516329181562384091";
pub const IMPLEMENTATION_VERSION_NAME: &str = "DCMSEND_1";

/// Native (uncompressed) little endian syntaxes.
pub fn is_native(transfer_syntax: &str) -> bool {
    transfer_syntax == IMPLICIT_VR_LITTLE_ENDIAN || transfer_syntax == EXPLICIT_VR_LITTLE_ENDIAN
}

/// Syntaxes whose data set is read and written as explicit VR little endian.
///
/// All encapsulated syntaxes qualify; deflate and big endian do not.
pub fn is_explicit_little_endian(transfer_syntax: &str) -> bool {
    transfer_syntax != IMPLICIT_VR_LITTLE_ENDIAN
        && transfer_syntax != DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN
        && transfer_syntax != EXPLICIT_VR_BIG_ENDIAN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_syntaxes() {
        assert!(is_native(IMPLICIT_VR_LITTLE_ENDIAN));
        assert!(is_native(EXPLICIT_VR_LITTLE_ENDIAN));
        assert!(!is_native(RLE_LOSSLESS));
    }

    #[test]
    fn test_explicit_little_endian() {
        assert!(is_explicit_little_endian(EXPLICIT_VR_LITTLE_ENDIAN));
        assert!(is_explicit_little_endian(JPEG_LS_LOSSLESS));
        assert!(!is_explicit_little_endian(IMPLICIT_VR_LITTLE_ENDIAN));
        assert!(!is_explicit_little_endian(EXPLICIT_VR_BIG_ENDIAN));
    }
}
