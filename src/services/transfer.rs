use crate::dicom::dimse::{self, StatusKind};
use crate::dicom::part10;
use crate::dicom::ul::{
    self, AssociateAc, AssociateRq, CONTEXT_ACCEPTED, Pdu, PduError, Pdv,
    PresentationContextProposal, UserInformation,
};
use crate::dicom::uids;
use crate::models::{Artifact, TransferConfig};
use crate::services::converter::ConvertedArtifact;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Largest PDU accepted while negotiating, whatever our own P-DATA limit is.
const MIN_READ_LIMIT: u32 = 64 * 1024;
/// PDV payload size used when the peer does not limit PDU length.
const UNLIMITED_FRAGMENT_LEN: usize = 1024 * 1024;
/// Bytes of P-DATA body taken by one PDV item header.
const PDV_HEADER_LEN: usize = 6;
const MESSAGE_ID: u16 = 1;

/// Errors that end an association before an accept status is received
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),

    #[error("Association rejected (result {result}, source {origin}, reason {reason})")]
    AssociationRejected { result: u8, origin: u8, reason: u8 },

    #[error("Association aborted by peer (source {origin}, reason {reason})")]
    Aborted { origin: u8, reason: u8 },

    #[error("Destination accepted no presentation context for {0}")]
    NoAcceptedContext(String),

    #[error("Artifact has no {0}")]
    MissingUid(&'static str),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Pdu(#[from] PduError),
}

/// What the destination said about a stored instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Accepted,
    Rejected {
        status: u16,
        comment: Option<String>,
    },
}

/// Network capability that delivers one artifact to a destination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreTransport: Send + Sync {
    async fn store(
        &self,
        artifact: &Artifact,
        config: &TransferConfig,
    ) -> Result<StoreOutcome, TransferError>;
}

/// C-STORE over a DICOM Upper Layer association on TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct DimseTransport;

#[async_trait]
impl StoreTransport for DimseTransport {
    async fn store(
        &self,
        artifact: &Artifact,
        config: &TransferConfig,
    ) -> Result<StoreOutcome, TransferError> {
        let sop_class = artifact
            .sop_class_uid()
            .ok_or(TransferError::MissingUid("SOP Class UID"))?;
        let sop_instance = artifact
            .sop_instance_uid()
            .ok_or(TransferError::MissingUid("SOP Instance UID"))?;

        let address = config.destination();
        tracing::debug!(
            "Connecting to {} ({} -> {})",
            address,
            config.local_ae,
            config.remote_ae
        );
        let mut stream = with_timeout(
            config.network.connect_timeout,
            "connection",
            TcpStream::connect((config.host_name(), config.port)),
        )
        .await?
        .map_err(|source| TransferError::Connect {
            address: address.clone(),
            source,
        })?;

        let result = store_on(&mut stream, artifact, config, &sop_class, &sop_instance).await;

        if let Err(e) = &result {
            if !matches!(
                e,
                TransferError::AssociationRejected { .. } | TransferError::Aborted { .. }
            ) {
                // The peer may already be gone.
                let abort = Pdu::Abort {
                    source: 0,
                    reason: 0,
                };
                let limit = config.network.response_timeout;
                match timeout(limit, ul::write_pdu(&mut stream, &abort)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(abort_error)) => tracing::debug!("Could not send A-ABORT: {}", abort_error),
                    Err(_) => tracing::debug!("Timed out sending A-ABORT"),
                }
            }
        }
        result
    }
}

async fn with_timeout<F, T>(limit: Duration, what: &'static str, future: F) -> Result<T, TransferError>
where
    F: Future<Output = T>,
{
    timeout(limit, future)
        .await
        .map_err(|_| TransferError::Timeout(limit, what))
}

fn read_limit(config: &TransferConfig) -> u32 {
    match config.network.max_pdu_length {
        0 => u32::MAX,
        n => n.max(MIN_READ_LIMIT),
    }
}

/// Transfer syntaxes offered for an artifact, most preferred first.
fn proposed_syntaxes(transfer_syntax: &str) -> Vec<String> {
    let mut syntaxes = vec![transfer_syntax.to_string()];
    if uids::is_native(transfer_syntax) {
        for fallback in [uids::EXPLICIT_VR_LITTLE_ENDIAN, uids::IMPLICIT_VR_LITTLE_ENDIAN] {
            if fallback != transfer_syntax {
                syntaxes.push(fallback.to_string());
            }
        }
    }
    syntaxes
}

async fn store_on(
    stream: &mut TcpStream,
    artifact: &Artifact,
    config: &TransferConfig,
    sop_class: &str,
    sop_instance: &str,
) -> Result<StoreOutcome, TransferError> {
    let response_timeout = config.network.response_timeout;
    let limit = read_limit(config);

    // One context per syntax so the accepted one identifies the encoding.
    let syntaxes = proposed_syntaxes(&artifact.transfer_syntax());
    let proposals: Vec<PresentationContextProposal> = syntaxes
        .iter()
        .enumerate()
        .map(|(i, ts)| PresentationContextProposal {
            id: (2 * i + 1) as u8,
            abstract_syntax: sop_class.to_string(),
            transfer_syntaxes: vec![ts.clone()],
        })
        .collect();

    let request = Pdu::AssociateRq(AssociateRq {
        called_ae: config.remote_ae.clone(),
        calling_ae: config.local_ae.clone(),
        application_context: uids::DICOM_APPLICATION_CONTEXT.to_string(),
        presentation_contexts: proposals.clone(),
        user_information: UserInformation {
            max_pdu_length: config.network.max_pdu_length,
            implementation_class_uid: uids::IMPLEMENTATION_CLASS_UID.to_string(),
            implementation_version_name: Some(uids::IMPLEMENTATION_VERSION_NAME.to_string()),
        },
    });
    with_timeout(response_timeout, "association request to be sent", ul::write_pdu(stream, &request)).await??;

    let accepted = match with_timeout(response_timeout, "association response", ul::read_pdu(stream, limit)).await?? {
        Pdu::AssociateAc(ac) => ac,
        Pdu::AssociateRj {
            result,
            source,
            reason,
        } => {
            return Err(TransferError::AssociationRejected {
                result,
                origin: source,
                reason,
            });
        }
        Pdu::Abort { source, reason } => {
            return Err(TransferError::Aborted {
                origin: source,
                reason,
            });
        }
        other => {
            return Err(TransferError::Protocol(format!(
                "unexpected {:?} during association",
                other
            )));
        }
    };

    let (context_id, transfer_syntax) = select_context(&proposals, &accepted)
        .ok_or_else(|| TransferError::NoAcceptedContext(sop_class.to_string()))?;
    tracing::debug!(
        "Association accepted, sending with transfer syntax {}",
        transfer_syntax
    );

    let fragment_len = match accepted.user_information.max_pdu_length {
        0 => UNLIMITED_FRAGMENT_LEN,
        n => (n as usize).saturating_sub(PDV_HEADER_LEN).max(1),
    };

    let command = dimse::c_store_rq(MESSAGE_ID, sop_class, sop_instance);
    let data = part10::encode_dataset_for(&artifact.dataset, &transfer_syntax);
    let message = Message {
        context_id,
        fragment_len,
        write_timeout: response_timeout,
    };
    message.send(stream, true, &command).await?;
    message.send(stream, false, &data).await?;

    let response = read_store_response(stream, response_timeout, limit).await?;
    if response.message_id_being_responded_to != MESSAGE_ID {
        tracing::warn!(
            "Response refers to message {}, expected {}",
            response.message_id_being_responded_to,
            MESSAGE_ID
        );
    }

    release(stream, response_timeout, limit).await;

    let outcome = match dimse::classify_status(response.status) {
        StatusKind::Success => StoreOutcome::Accepted,
        _ => StoreOutcome::Rejected {
            status: response.status,
            comment: response.error_comment,
        },
    };
    Ok(outcome)
}

/// First accepted context, in proposal order.
fn select_context(
    proposals: &[PresentationContextProposal],
    accepted: &AssociateAc,
) -> Option<(u8, String)> {
    proposals.iter().find_map(|proposal| {
        accepted
            .presentation_contexts
            .iter()
            .find(|result| result.id == proposal.id && result.result == CONTEXT_ACCEPTED)
            .map(|result| {
                let syntax = if result.transfer_syntax.is_empty() {
                    proposal.transfer_syntaxes[0].clone()
                } else {
                    result.transfer_syntax.clone()
                };
                (proposal.id, syntax)
            })
    })
}

/// How one DIMSE message is split into P-DATA-TF PDUs.
struct Message {
    context_id: u8,
    fragment_len: usize,
    /// Limit on each PDU write, so a peer that stops reading cannot stall us
    write_timeout: Duration,
}

impl Message {
    async fn send(&self, stream: &mut TcpStream, is_command: bool, bytes: &[u8]) -> Result<(), TransferError> {
        let mut chunks = bytes.chunks(self.fragment_len).peekable();
        if chunks.peek().is_none() {
            return self.write(stream, is_command, true, Vec::new()).await;
        }
        while let Some(chunk) = chunks.next() {
            let is_last = chunks.peek().is_none();
            self.write(stream, is_command, is_last, chunk.to_vec()).await?;
        }
        Ok(())
    }

    async fn write(
        &self,
        stream: &mut TcpStream,
        is_command: bool,
        is_last: bool,
        data: Vec<u8>,
    ) -> Result<(), TransferError> {
        let pdv = Pdv {
            context_id: self.context_id,
            is_command,
            is_last,
            data,
        };
        let what = if is_command { "command to be sent" } else { "data set to be sent" };
        with_timeout(self.write_timeout, what, ul::write_pdu(stream, &Pdu::PData(vec![pdv]))).await??;
        Ok(())
    }
}

async fn read_store_response(
    stream: &mut TcpStream,
    response_timeout: Duration,
    limit: u32,
) -> Result<dimse::StoreResponse, TransferError> {
    let mut command = Vec::new();
    loop {
        match with_timeout(response_timeout, "C-STORE response", ul::read_pdu(stream, limit)).await?? {
            Pdu::PData(pdvs) => {
                for pdv in pdvs.into_iter().filter(|pdv| pdv.is_command) {
                    command.extend_from_slice(&pdv.data);
                    if pdv.is_last {
                        let set = dimse::decode_command(&command)
                            .map_err(|e| TransferError::Protocol(format!("bad response command: {}", e)))?;
                        return dimse::parse_store_response(&set).ok_or_else(|| {
                            TransferError::Protocol("response is not a C-STORE-RSP".to_string())
                        });
                    }
                }
            }
            Pdu::Abort { source, reason } => {
                return Err(TransferError::Aborted {
                    origin: source,
                    reason,
                });
            }
            other => {
                return Err(TransferError::Protocol(format!(
                    "unexpected {:?} while waiting for response",
                    other
                )));
            }
        }
    }
}

/// Release the association; the store outcome is already known, so problems
/// here are only logged.
async fn release(stream: &mut TcpStream, response_timeout: Duration, limit: u32) {
    match timeout(response_timeout, ul::write_pdu(stream, &Pdu::ReleaseRq)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!("Could not send release request: {}", e);
            return;
        }
        Err(_) => {
            tracing::debug!("Timed out sending release request");
            return;
        }
    }
    match timeout(response_timeout, ul::read_pdu(stream, limit)).await {
        Ok(Ok(Pdu::ReleaseRp)) => {}
        Ok(Ok(other)) => tracing::debug!("Unexpected reply to release: {:?}", other),
        Ok(Err(e)) => tracing::debug!("Release failed: {}", e),
        Err(_) => tracing::debug!("Timed out waiting for release reply"),
    }
}

/// Sends converted artifacts and reports a plain accept/not-accept.
#[derive(Clone)]
pub struct TransferClient {
    transport: Arc<dyn StoreTransport>,
}

impl Default for TransferClient {
    fn default() -> Self {
        Self::new(Arc::new(DimseTransport))
    }
}

impl TransferClient {
    pub fn new(transport: Arc<dyn StoreTransport>) -> Self {
        Self { transport }
    }

    /// Returns true only when the destination answers with a success status.
    /// Every failure is logged here and never propagated.
    pub async fn send(&self, converted: &ConvertedArtifact, config: &TransferConfig) -> bool {
        let destination = format!("{}@{}", config.remote_ae, config.destination());
        match self.transport.store(converted.artifact(), config).await {
            Ok(StoreOutcome::Accepted) => {
                tracing::info!("Stored on {}", destination);
                true
            }
            Ok(StoreOutcome::Rejected { status, comment }) => {
                tracing::warn!(
                    "{} refused the instance: status 0x{:04X}{}",
                    destination,
                    status,
                    comment.map(|c| format!(" ({})", c)).unwrap_or_default()
                );
                false
            }
            Err(e) => {
                tracing::error!("Transfer to {} failed: {}", destination, e);
                false
            }
        }
    }
}
