//! Integration tests for the single-file pipeline
//!
//! These tests verify:
//! - Deletion only after an accepted transfer, and only when configured
//! - Load, conversion and transfer failures leave the source untouched
//! - Conversion output (syntax, charset) as seen by the destination
//! - Charset repair on implicit VR files, including private text

mod common;

use common::{FakeScp, IVANOV_1251, image, temp_folder, write_image};
use dcmsend::dicom::{part10, uids};
use dcmsend::models::{CompressionScheme, Element, PipelineStatus, Tag, TransferConfig, Value, Vr, tags};
use dcmsend::services::{
    ArtifactTranscoder, FileConverter, FilePipeline, TransferClient,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

fn config(port: u16) -> TransferConfig {
    let mut config = TransferConfig::new("127.0.0.1", port, "DCMSEND", "STORESCP");
    config.network.connect_timeout = Duration::from_secs(2);
    config.network.response_timeout = Duration::from_secs(2);
    config
}

fn pipeline(config: TransferConfig) -> FilePipeline {
    FilePipeline::new(
        FileConverter::new(ArtifactTranscoder::default()),
        TransferClient::default(),
        Arc::new(config),
    )
}

#[tokio::test]
async fn test_sent_file_is_deleted() {
    let (_temp, dir) = temp_folder();
    let path = write_image(&dir, "a.dcm", "1.2.3.1");
    let scp = FakeScp::accepting().await;

    let result = pipeline(config(scp.port)).run(&path).await;

    assert!(result.success);
    assert_eq!(result.status, PipelineStatus::Sent);
    assert!(result.source_deleted);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_keep_leaves_source_unchanged() {
    let (_temp, dir) = temp_folder();
    let path = write_image(&dir, "a.dcm", "1.2.3.1");
    let before = fs::read(&path).unwrap();
    let scp = FakeScp::accepting().await;

    let mut config = config(scp.port);
    config.delete_after_send = false;
    config.reencode_text = true;
    config.compression = Some(CompressionScheme::Rle);
    let result = pipeline(config).run(&path).await;

    assert!(result.success);
    assert!(!result.source_deleted);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_rejected_file_is_kept() {
    let (_temp, dir) = temp_folder();
    let path = write_image(&dir, "a.dcm", "1.2.3.1");
    let scp = FakeScp::with_status(|_| 0xC000).await;

    let result = pipeline(config(scp.port)).run(&path).await;

    assert!(!result.success);
    assert_eq!(result.status, PipelineStatus::TransferFailed);
    assert!(!result.source_deleted);
    assert!(path.exists());
}

#[tokio::test]
async fn test_unreadable_file_fails_to_load() {
    let (_temp, dir) = temp_folder();
    let path = dir.join("notes.dcm");
    fs::write(&path, b"definitely not DICOM").unwrap();
    let scp = FakeScp::accepting().await;

    let result = pipeline(config(scp.port)).run(&path).await;

    assert!(!result.success);
    assert_eq!(result.status, PipelineStatus::LoadFailed);
    assert!(path.exists());
    assert!(scp.received().is_empty());
}

#[tokio::test]
async fn test_missing_file_fails_to_load() {
    let (_temp, dir) = temp_folder();
    let scp = FakeScp::accepting().await;

    let result = pipeline(config(scp.port)).run(&dir.join("gone.dcm")).await;

    assert_eq!(result.status, PipelineStatus::LoadFailed);
}

#[tokio::test]
async fn test_conversion_failure_sends_nothing() {
    let (_temp, dir) = temp_folder();
    // 4x4 at 16 bits needs 32 bytes; the image carries 16.
    let mut artifact = image("1.2.3.1", IVANOV_1251);
    artifact.dataset.put_u16(tags::BITS_ALLOCATED, 16);
    let path = dir.join("short.dcm");
    fs::write(&path, part10::encode_file(&artifact)).unwrap();
    let scp = FakeScp::accepting().await;

    let mut config = config(scp.port);
    config.compression = Some(CompressionScheme::Jpeg2000);
    let result = pipeline(config).run(&path).await;

    assert!(!result.success);
    assert_eq!(result.status, PipelineStatus::ConversionFailed);
    assert!(path.exists());
    assert!(scp.received().is_empty());
}

#[tokio::test]
async fn test_destination_sees_converted_artifact() {
    let (_temp, dir) = temp_folder();
    let path = write_image(&dir, "a.dcm", "1.2.3.1");
    let scp = FakeScp::accepting().await;

    let mut config = config(scp.port);
    config.compression = Some(CompressionScheme::JpegLs);
    config.reencode_text = true;
    assert!(pipeline(config).run(&path).await.success);

    let received = scp.received();
    assert_eq!(received[0].transfer_syntax, uids::JPEG_LS_LOSSLESS);
    let set = &received[0].dataset;
    assert_eq!(set.string(tags::PATIENT_NAME).unwrap(), "Иванов^Иван");
    assert_eq!(set.string(tags::SPECIFIC_CHARACTER_SET).unwrap(), "ISO_IR 192");
    let Value::Encapsulated { fragments, .. } = &set.get(tags::PIXEL_DATA).unwrap().value else {
        panic!("expected encapsulated pixel data");
    };
    assert_eq!(fragments.len(), 1);
    // SOI then the JPEG-LS frame header
    assert!(fragments[0].starts_with(&[0xFF, 0xD8, 0xFF, 0xF7]));
}

#[tokio::test]
async fn test_every_scheme_reaches_the_destination() {
    let (_temp, dir) = temp_folder();
    let scp = FakeScp::accepting().await;

    let schemes = [
        CompressionScheme::Jpeg,
        CompressionScheme::Jpeg2000,
        CompressionScheme::JpegLs,
        CompressionScheme::Rle,
    ];
    for (n, scheme) in schemes.into_iter().enumerate() {
        let path = write_image(&dir, &format!("{}.dcm", n), &format!("1.2.3.{}", n));
        let mut config = config(scp.port);
        config.compression = Some(scheme);
        let result = pipeline(config).run(&path).await;
        assert!(result.success, "{}: {:?}", scheme, result.message);
    }

    let syntaxes: Vec<String> = scp.received().into_iter().map(|r| r.transfer_syntax).collect();
    assert_eq!(
        syntaxes,
        vec![
            uids::JPEG_BASELINE,
            uids::JPEG_2000_LOSSLESS,
            uids::JPEG_LS_LOSSLESS,
            uids::RLE_LOSSLESS
        ]
    );
}

#[tokio::test]
async fn test_without_fix1251_text_passes_through() {
    let (_temp, dir) = temp_folder();
    let path = write_image(&dir, "a.dcm", "1.2.3.1");
    let scp = FakeScp::accepting().await;

    assert!(pipeline(config(scp.port)).run(&path).await.success);

    let received = scp.received();
    assert_eq!(
        received[0].dataset.get(tags::PATIENT_NAME).unwrap().bytes(),
        Some(IVANOV_1251)
    );
    assert_eq!(
        received[0].dataset.string(tags::SPECIFIC_CHARACTER_SET).unwrap(),
        "ISO_IR 144"
    );
}

#[tokio::test]
async fn test_fix1251_repairs_implicit_vr_text() {
    // "Петров" and "Норма " in windows-1251
    const PETROV_1251: &[u8] = &[0xCF, 0xE5, 0xF2, 0xF0, 0xEE, 0xE2];
    const NORMA_1251: &[u8] = &[0xCD, 0xEE, 0xF0, 0xEC, 0xE0, 0x20];
    const BINARY: &[u8] = &[0x00, 0x00, 0x80, 0x3F];

    let (_temp, dir) = temp_folder();
    let mut artifact = image("1.2.3.1", IVANOV_1251);
    artifact
        .meta
        .put_text(tags::TRANSFER_SYNTAX_UID, Vr::UI, uids::IMPLICIT_VR_LITTLE_ENDIAN);
    let set = &mut artifact.dataset;
    set.insert(Element::new(Tag(0x0008, 0x1048), Vr::PN, Value::Bytes(PETROV_1251.to_vec())));
    set.insert(Element::new(Tag(0x0032, 0x4000), Vr::LT, Value::Bytes(NORMA_1251.to_vec())));
    set.put_text(Tag(0x0009, 0x0010), Vr::LO, "ACME 1.0");
    set.insert(Element::new(Tag(0x0009, 0x1001), Vr::UN, Value::Bytes(PETROV_1251.to_vec())));
    set.insert(Element::new(Tag(0x0009, 0x1002), Vr::UN, Value::Bytes(BINARY.to_vec())));
    let path = dir.join("implicit.dcm");
    fs::write(&path, part10::encode_file(&artifact)).unwrap();
    let scp = FakeScp::accepting().await;

    let mut config = config(scp.port);
    config.reencode_text = true;
    assert!(pipeline(config).run(&path).await.success);

    let received = scp.received();
    let set = &received[0].dataset;
    assert_eq!(set.string(tags::PATIENT_NAME).unwrap(), "Иванов^Иван");
    assert_eq!(set.string(Tag(0x0008, 0x1048)).unwrap(), "Петров");
    assert_eq!(set.string(Tag(0x0032, 0x4000)).unwrap(), "Норма");
    assert_eq!(set.string(Tag(0x0009, 0x1001)).unwrap(), "Петров");
    assert_eq!(set.get(Tag(0x0009, 0x1002)).unwrap().bytes(), Some(BINARY));
    assert_eq!(set.string(tags::SPECIFIC_CHARACTER_SET).unwrap(), "ISO_IR 192");
}
