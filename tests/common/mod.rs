//! Shared fixtures: Part 10 test files and a loopback Storage SCP.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use dcmsend::dicom::ul::{self, AssociateAc, Pdu, Pdv, PresentationContextResult, UserInformation};
use dcmsend::dicom::{dimse, part10, uids};
use dcmsend::models::{Artifact, DataSet, Element, Value, Vr, tags};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};

pub const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";

/// "Иванов^Иван" in windows-1251
pub const IVANOV_1251: &[u8] = &[
    0xC8, 0xE2, 0xE0, 0xED, 0xEE, 0xE2, 0x5E, 0xC8, 0xE2, 0xE0, 0xED, 0x20,
];

pub fn temp_folder() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, path)
}

/// 4x4 8-bit monochrome image in explicit VR little endian.
pub fn image(sop_instance_uid: &str, patient_name: &[u8]) -> Artifact {
    let mut meta = DataSet::new();
    meta.insert(Element::new(tags::FILE_META_VERSION, Vr::OB, Value::Bytes(vec![0, 1])));
    meta.put_text(tags::MEDIA_STORAGE_SOP_CLASS_UID, Vr::UI, SECONDARY_CAPTURE);
    meta.put_text(tags::MEDIA_STORAGE_SOP_INSTANCE_UID, Vr::UI, sop_instance_uid);
    meta.put_text(tags::TRANSFER_SYNTAX_UID, Vr::UI, uids::EXPLICIT_VR_LITTLE_ENDIAN);

    let mut dataset = DataSet::new();
    dataset.put_text(tags::SPECIFIC_CHARACTER_SET, Vr::CS, "ISO_IR 144");
    dataset.put_text(tags::SOP_CLASS_UID, Vr::UI, SECONDARY_CAPTURE);
    dataset.put_text(tags::SOP_INSTANCE_UID, Vr::UI, sop_instance_uid);
    dataset.insert(Element::new(
        tags::PATIENT_NAME,
        Vr::PN,
        Value::Bytes(patient_name.to_vec()),
    ));
    dataset.put_u16(tags::SAMPLES_PER_PIXEL, 1);
    dataset.put_text(tags::PHOTOMETRIC_INTERPRETATION, Vr::CS, "MONOCHROME2");
    dataset.put_u16(tags::ROWS, 4);
    dataset.put_u16(tags::COLUMNS, 4);
    dataset.put_u16(tags::BITS_ALLOCATED, 8);
    dataset.insert(Element::new(
        tags::PIXEL_DATA,
        Vr::OB,
        Value::Bytes((0u8..16).collect()),
    ));
    Artifact::new(meta, dataset)
}

pub fn write_image(dir: &Utf8Path, name: &str, sop_instance_uid: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, part10::encode_file(&image(sop_instance_uid, IVANOV_1251))).unwrap();
    path
}

/// One instance received by the fake SCP.
#[derive(Debug, Clone)]
pub struct Received {
    pub calling_ae: String,
    pub called_ae: String,
    pub transfer_syntax: String,
    pub sop_instance_uid: String,
    pub dataset: DataSet,
    pub pdata_pdus: usize,
}

#[derive(Clone, Copy)]
pub enum Behaviour {
    /// Accept the association and answer with the status for each instance
    Store,
    /// Reject every association request
    RejectAssociation,
    /// Accept the connection and never reply
    Silent,
    /// Accept the association, then never read again
    StopReading,
}

type StatusFn = Arc<dyn Fn(&str) -> u16 + Send + Sync>;

/// Minimal Storage SCP on 127.0.0.1 for end-to-end tests.
pub struct FakeScp {
    pub port: u16,
    received: Arc<Mutex<Vec<Received>>>,
}

impl FakeScp {
    /// Accept everything with status 0x0000.
    pub async fn accepting() -> Self {
        Self::start(Behaviour::Store, Arc::new(|_: &str| 0x0000u16), 16384).await
    }

    /// Answer with `status(sop_instance_uid)`.
    pub async fn with_status<F>(status: F) -> Self
    where
        F: Fn(&str) -> u16 + Send + Sync + 'static,
    {
        Self::start(Behaviour::Store, Arc::new(status), 16384).await
    }

    pub async fn start(behaviour: Behaviour, status: StatusFn, max_pdu_length: u32) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = received.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let sink = sink.clone();
                let status = status.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, behaviour, status, max_pdu_length, sink).await;
                });
            }
        });

        Self { port, received }
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

/// A port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn serve(
    mut stream: TcpStream,
    behaviour: Behaviour,
    status: StatusFn,
    max_pdu_length: u32,
    sink: Arc<Mutex<Vec<Received>>>,
) -> Result<(), ul::PduError> {
    let Pdu::AssociateRq(request) = ul::read_pdu(&mut stream, u32::MAX).await? else {
        return Ok(());
    };

    match behaviour {
        Behaviour::Silent => {
            // Hold the connection open until the client gives up.
            let _ = ul::read_pdu(&mut stream, u32::MAX).await;
            return Ok(());
        }
        Behaviour::RejectAssociation => {
            let reject = Pdu::AssociateRj {
                result: 1,
                source: 1,
                reason: 3,
            };
            return ul::write_pdu(&mut stream, &reject).await;
        }
        Behaviour::Store | Behaviour::StopReading => {}
    }

    let contexts: Vec<PresentationContextResult> = request
        .presentation_contexts
        .iter()
        .map(|proposal| PresentationContextResult {
            id: proposal.id,
            result: 0,
            transfer_syntax: proposal.transfer_syntaxes[0].clone(),
        })
        .collect();

    let accept = Pdu::AssociateAc(AssociateAc {
        called_ae: request.called_ae.clone(),
        calling_ae: request.calling_ae.clone(),
        application_context: request.application_context.clone(),
        presentation_contexts: contexts.clone(),
        user_information: UserInformation {
            max_pdu_length,
            implementation_class_uid: "1.2.826.0.1.3680043.9.9999".to_string(),
            implementation_version_name: Some("FAKESCP".to_string()),
        },
    });
    ul::write_pdu(&mut stream, &accept).await?;
    if let Behaviour::StopReading = behaviour {
        // Keep the socket open with nothing draining it.
        std::future::pending::<()>().await;
    }

    let mut command = Vec::new();
    let mut data = Vec::new();
    let mut context_id = 0;
    let mut pdata_pdus = 0;
    let mut command_done = false;
    let mut data_done = false;

    while !(command_done && data_done) {
        match ul::read_pdu(&mut stream, u32::MAX).await? {
            Pdu::PData(pdvs) => {
                pdata_pdus += 1;
                for pdv in pdvs {
                    context_id = pdv.context_id;
                    if pdv.is_command {
                        command.extend_from_slice(&pdv.data);
                        command_done |= pdv.is_last;
                    } else {
                        data.extend_from_slice(&pdv.data);
                        data_done |= pdv.is_last;
                    }
                }
            }
            _ => return Ok(()),
        }
    }

    let command = dimse::decode_command(&command).unwrap();
    let message_id = command.u16(dimse::MESSAGE_ID).unwrap();
    let sop_class = command.string(dimse::AFFECTED_SOP_CLASS_UID).unwrap();
    let sop_instance = command.string(dimse::AFFECTED_SOP_INSTANCE_UID).unwrap();
    let transfer_syntax = contexts
        .iter()
        .find(|c| c.id == context_id)
        .map(|c| c.transfer_syntax.clone())
        .unwrap();
    let dataset = part10::read_dataset_bytes(&data, &transfer_syntax).unwrap();

    sink.lock().unwrap().push(Received {
        calling_ae: request.calling_ae.clone(),
        called_ae: request.called_ae.clone(),
        transfer_syntax,
        sop_instance_uid: sop_instance.clone(),
        dataset,
        pdata_pdus,
    });

    let status = status(&sop_instance);
    let mut response = dimse::c_store_rsp(message_id, &sop_class, &sop_instance, status);
    if status != 0x0000 {
        response = dimse::with_error_comment(&response, "Refused by test peer").unwrap();
    }
    let pdv = Pdv {
        context_id,
        is_command: true,
        is_last: true,
        data: response,
    };
    ul::write_pdu(&mut stream, &Pdu::PData(vec![pdv])).await?;

    if let Pdu::ReleaseRq = ul::read_pdu(&mut stream, u32::MAX).await? {
        ul::write_pdu(&mut stream, &Pdu::ReleaseRp).await?;
    }
    Ok(())
}
