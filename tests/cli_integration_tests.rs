//! End-to-end tests of the `dcmsend` binary
//!
//! These tests verify:
//! - Exit codes for single-file success, refusal and usage errors
//! - Folder mode always exits 0 and prints the summary line
//! - Legacy single-dash flags

mod common;

use camino::Utf8Path;
use common::{FakeScp, temp_folder, write_image};
use std::process::Output;
use tokio::process::Command;

async fn dcmsend(work_dir: &Utf8Path, args: &[&str]) -> Output {
    let settings = work_dir.join("dcmsend.yaml");
    std::fs::write(
        &settings,
        format!(
            "log_dir: \"{}\"\nconnect_timeout_secs: 5\nresponse_timeout_secs: 5\n",
            work_dir.join("logs")
        ),
    )
    .unwrap();

    Command::new(env!("CARGO_BIN_EXE_dcmsend"))
        .arg("--quiet")
        .arg("--config")
        .arg(settings.as_str())
        .args(args)
        .output()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_file_success_exits_zero_and_deletes() {
    let (_temp, dir) = temp_folder();
    let path = write_image(&dir, "a.dcm", "1.2.3.1");
    let scp = FakeScp::accepting().await;
    let port = scp.port.to_string();

    let output = dcmsend(&dir, &[path.as_str(), "127.0.0.1", &port, "DCMSEND", "STORESCP"]).await;

    assert_eq!(output.status.code(), Some(0));
    assert!(!path.exists());
    assert_eq!(scp.received().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_file_refusal_exits_one() {
    let (_temp, dir) = temp_folder();
    let path = write_image(&dir, "a.dcm", "1.2.3.1");
    let scp = FakeScp::with_status(|_| 0xA700).await;
    let port = scp.port.to_string();

    let output = dcmsend(&dir, &[path.as_str(), "127.0.0.1", &port, "DCMSEND", "STORESCP"]).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_keep_flag_keeps_source() {
    let (_temp, dir) = temp_folder();
    let path = write_image(&dir, "a.dcm", "1.2.3.1");
    let scp = FakeScp::accepting().await;
    let port = scp.port.to_string();

    let output = dcmsend(
        &dir,
        &["-keep", path.as_str(), "127.0.0.1", &port, "DCMSEND", "STORESCP"],
    )
    .await;

    assert_eq!(output.status.code(), Some(0));
    assert!(path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_folder_mode_prints_summary_and_exits_zero() {
    let (_temp, dir) = temp_folder();
    let input = dir.join("input");
    std::fs::create_dir(&input).unwrap();
    write_image(&input, "a.dcm", "1.2.3.1");
    write_image(&input, "b.dcm", "1.2.3.2");
    write_image(&input, "c.dcm", "1.2.3.3");
    let scp = FakeScp::with_status(|uid| if uid == "1.2.3.2" { 0xA700 } else { 0x0000 }).await;
    let port = scp.port.to_string();

    let output = dcmsend(
        &dir,
        &[
            "-folder",
            input.as_str(),
            "-compress",
            "rle",
            "-fix1251",
            "127.0.0.1",
            &port,
            "DCMSEND",
            "STORESCP",
        ],
    )
    .await;

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 of 3 succeeded."), "stdout: {}", stdout);
    assert!(input.join("b.dcm").exists());
    assert!(!input.join("a.dcm").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_folder_still_exits_zero() {
    let (_temp, dir) = temp_folder();
    let output = dcmsend(
        &dir,
        &["-folder", dir.join("absent").as_str(), "127.0.0.1", "104", "A", "B"],
    )
    .await;

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("0 of 0 succeeded."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_usage_errors_exit_two() {
    let (_temp, dir) = temp_folder();

    let too_few = dcmsend(&dir, &["127.0.0.1", "104"]).await;
    assert_eq!(too_few.status.code(), Some(2));

    let bad_port = dcmsend(&dir, &["a.dcm", "127.0.0.1", "port", "A", "B"]).await;
    assert_eq!(bad_port.status.code(), Some(2));

    let bad_ae = dcmsend(&dir, &["a.dcm", "127.0.0.1", "104", "WAY_TOO_LONG_AE_TITLE", "B"]).await;
    assert_eq!(bad_ae.status.code(), Some(2));
}
