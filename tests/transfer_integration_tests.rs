//! Integration tests for TransferClient and DimseTransport against a
//! loopback Storage SCP
//!
//! These tests verify:
//! - Accept / refuse / association rejection outcomes
//! - Fragmentation to the peer's maximum PDU length
//! - Connection failures and response timeouts reported as `false`
//! - A peer that stops reading mid-transfer cannot stall the sender

mod common;

use common::{Behaviour, FakeScp, IVANOV_1251, closed_port, image};
use dcmsend::dicom::uids;
use dcmsend::models::{Element, TransferConfig, Value, Vr, tags};
use dcmsend::services::{
    ConvertedArtifact, DimseTransport, FileConverter, StoreOutcome, StoreTransport, TransferClient,
    TransferError,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn config(port: u16) -> TransferConfig {
    let mut config = TransferConfig::new("127.0.0.1", port, "DCMSEND", "STORESCP");
    config.network.connect_timeout = Duration::from_secs(2);
    config.network.response_timeout = Duration::from_secs(2);
    config
}

fn converted(sop_instance_uid: &str, config: &TransferConfig) -> ConvertedArtifact {
    FileConverter::default()
        .convert(image(sop_instance_uid, IVANOV_1251), config)
        .unwrap()
}

#[tokio::test]
async fn test_send_accepted() {
    let scp = FakeScp::accepting().await;
    let config = config(scp.port);

    let client = TransferClient::default();
    assert!(client.send(&converted("1.2.3.1", &config), &config).await);

    let received = scp.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].calling_ae, "DCMSEND");
    assert_eq!(received[0].called_ae, "STORESCP");
    assert_eq!(received[0].sop_instance_uid, "1.2.3.1");
    assert_eq!(received[0].transfer_syntax, uids::EXPLICIT_VR_LITTLE_ENDIAN);
    assert_eq!(
        received[0].dataset.get(tags::PATIENT_NAME).unwrap().bytes(),
        Some(IVANOV_1251)
    );
}

#[tokio::test]
async fn test_refusal_status_is_false() {
    let scp = FakeScp::with_status(|_| 0xA700).await;
    let config = config(scp.port);

    assert!(!TransferClient::default().send(&converted("1.2.3.1", &config), &config).await);
    assert_eq!(scp.received().len(), 1);
}

#[tokio::test]
async fn test_warning_status_is_not_accepted() {
    let scp = FakeScp::with_status(|_| 0xB000).await;
    let config = config(scp.port);

    let outcome = DimseTransport
        .store(converted("1.2.3.1", &config).artifact(), &config)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        StoreOutcome::Rejected {
            status: 0xB000,
            comment: None
        }
    );
}

#[tokio::test]
async fn test_association_rejected() {
    let scp = FakeScp::start(Behaviour::RejectAssociation, Arc::new(|_: &str| 0u16), 16384).await;
    let config = config(scp.port);

    let result = DimseTransport
        .store(converted("1.2.3.1", &config).artifact(), &config)
        .await;
    assert!(matches!(
        result,
        Err(TransferError::AssociationRejected { result: 1, .. })
    ));
    assert!(!TransferClient::default().send(&converted("1.2.3.1", &config), &config).await);
}

#[tokio::test]
async fn test_connection_refused() {
    let config = config(closed_port().await);

    let result = DimseTransport
        .store(converted("1.2.3.1", &config).artifact(), &config)
        .await;
    assert!(matches!(result, Err(TransferError::Connect { .. })));
}

#[tokio::test]
async fn test_silent_peer_times_out() {
    let scp = FakeScp::start(Behaviour::Silent, Arc::new(|_: &str| 0u16), 16384).await;
    let mut config = config(scp.port);
    config.network.response_timeout = Duration::from_millis(200);

    let result = DimseTransport
        .store(converted("1.2.3.1", &config).artifact(), &config)
        .await;
    assert!(matches!(result, Err(TransferError::Timeout(_, _))));
}

#[tokio::test]
async fn test_peer_that_stops_reading_times_out() {
    let scp = FakeScp::start(Behaviour::StopReading, Arc::new(|_: &str| 0u16), 65536).await;
    let mut config = config(scp.port);
    config.network.response_timeout = Duration::from_millis(500);

    // 32 MB of pixels, well past what the loopback socket buffers hold.
    let mut artifact = image("1.2.3.1", IVANOV_1251);
    artifact.dataset.put_u16(tags::ROWS, 4096);
    artifact.dataset.put_u16(tags::COLUMNS, 4096);
    artifact.dataset.put_u16(tags::BITS_ALLOCATED, 16);
    artifact.dataset.insert(Element::new(
        tags::PIXEL_DATA,
        Vr::OB,
        Value::Bytes(vec![0x5A; 4096 * 4096 * 2]),
    ));
    let converted = FileConverter::default().convert(artifact, &config).unwrap();

    let started = Instant::now();
    let sent = tokio::time::timeout(
        Duration::from_secs(30),
        TransferClient::default().send(&converted, &config),
    )
    .await
    .expect("send stalled on a peer that stopped reading");

    assert!(!sent);
    assert!(started.elapsed() < Duration::from_secs(15));
    assert!(scp.received().is_empty());
}

#[tokio::test]
async fn test_stalled_write_reports_timeout() {
    let scp = FakeScp::start(Behaviour::StopReading, Arc::new(|_: &str| 0u16), 0).await;
    let mut config = config(scp.port);
    config.network.response_timeout = Duration::from_millis(300);

    let mut artifact = image("1.2.3.2", IVANOV_1251);
    artifact.dataset.put_u16(tags::ROWS, 4096);
    artifact.dataset.put_u16(tags::COLUMNS, 4096);
    artifact.dataset.put_u16(tags::BITS_ALLOCATED, 16);
    artifact.dataset.insert(Element::new(
        tags::PIXEL_DATA,
        Vr::OB,
        Value::Bytes(vec![0; 4096 * 4096 * 2]),
    ));
    let converted = FileConverter::default().convert(artifact, &config).unwrap();

    let result = DimseTransport.store(converted.artifact(), &config).await;
    assert!(matches!(result, Err(TransferError::Timeout(_, _))), "{:?}", result);
}

#[tokio::test]
async fn test_large_data_set_is_fragmented() {
    let scp = FakeScp::start(Behaviour::Store, Arc::new(|_: &str| 0u16), 4096).await;
    let config = config(scp.port);

    let mut artifact = image("1.2.3.9", IVANOV_1251);
    artifact.dataset.put_u16(tags::ROWS, 100);
    artifact.dataset.put_u16(tags::COLUMNS, 100);
    let pixels: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    artifact.dataset.insert(Element::new(tags::PIXEL_DATA, Vr::OB, Value::Bytes(pixels.clone())));
    let converted = FileConverter::default().convert(artifact, &config).unwrap();

    assert!(TransferClient::default().send(&converted, &config).await);

    let received = scp.received();
    assert_eq!(received.len(), 1);
    // One command PDU plus at least three data PDUs.
    assert!(received[0].pdata_pdus >= 4);
    assert_eq!(
        received[0].dataset.get(tags::PIXEL_DATA).unwrap().bytes(),
        Some(&pixels[..])
    );
}

#[tokio::test]
async fn test_missing_uid_never_connects() {
    let scp = FakeScp::accepting().await;
    let config = config(scp.port);

    let mut artifact = image("1.2.3.1", IVANOV_1251);
    artifact.dataset.remove(tags::SOP_INSTANCE_UID);
    artifact.meta.remove(tags::MEDIA_STORAGE_SOP_INSTANCE_UID);
    let converted = FileConverter::default().convert(artifact, &config).unwrap();

    assert!(!TransferClient::default().send(&converted, &config).await);
    assert!(scp.received().is_empty());
}
