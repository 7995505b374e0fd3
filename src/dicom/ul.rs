//! DICOM Upper Layer protocol data units (PS3.8 section 9.3).
//!
//! PDU framing is big endian. The DIMSE messages carried inside P-DATA
//! values are encoded separately (see [`crate::dicom::dimse`]).

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const PDU_HEADER_LEN: usize = 6;
const AE_TITLE_LEN: usize = 16;
const PROTOCOL_VERSION: u16 = 0x0001;

const ITEM_APPLICATION_CONTEXT: u8 = 0x10;
const ITEM_PRESENTATION_CONTEXT_RQ: u8 = 0x20;
const ITEM_PRESENTATION_CONTEXT_AC: u8 = 0x21;
const ITEM_ABSTRACT_SYNTAX: u8 = 0x30;
const ITEM_TRANSFER_SYNTAX: u8 = 0x40;
const ITEM_USER_INFORMATION: u8 = 0x50;
const ITEM_MAX_LENGTH: u8 = 0x51;
const ITEM_IMPLEMENTATION_CLASS_UID: u8 = 0x52;
const ITEM_IMPLEMENTATION_VERSION_NAME: u8 = 0x55;

/// Presentation context result: acceptance.
pub const CONTEXT_ACCEPTED: u8 = 0;

#[derive(Error, Debug)]
pub enum PduError {
    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown PDU type 0x{0:02X}")]
    UnknownType(u8),

    #[error("Malformed PDU: {0}")]
    Malformed(String),

    #[error("PDU of {length} bytes exceeds limit of {max}")]
    TooLarge { length: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationContextProposal {
    pub id: u8,
    pub abstract_syntax: String,
    pub transfer_syntaxes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationContextResult {
    pub id: u8,
    pub result: u8,
    pub transfer_syntax: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInformation {
    pub max_pdu_length: u32,
    pub implementation_class_uid: String,
    pub implementation_version_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociateRq {
    pub called_ae: String,
    pub calling_ae: String,
    pub application_context: String,
    pub presentation_contexts: Vec<PresentationContextProposal>,
    pub user_information: UserInformation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociateAc {
    pub called_ae: String,
    pub calling_ae: String,
    pub application_context: String,
    pub presentation_contexts: Vec<PresentationContextResult>,
    pub user_information: UserInformation,
}

/// Presentation data value: one fragment of a command or data set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdv {
    pub context_id: u8,
    pub is_command: bool,
    pub is_last: bool,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu {
    AssociateRq(AssociateRq),
    AssociateAc(AssociateAc),
    AssociateRj { result: u8, source: u8, reason: u8 },
    PData(Vec<Pdv>),
    ReleaseRq,
    ReleaseRp,
    Abort { source: u8, reason: u8 },
}

impl Pdu {
    fn type_code(&self) -> u8 {
        match self {
            Pdu::AssociateRq(_) => 0x01,
            Pdu::AssociateAc(_) => 0x02,
            Pdu::AssociateRj { .. } => 0x03,
            Pdu::PData(_) => 0x04,
            Pdu::ReleaseRq => 0x05,
            Pdu::ReleaseRp => 0x06,
            Pdu::Abort { .. } => 0x07,
        }
    }
}

/// Encode a PDU including its 6-byte header.
pub fn encode(pdu: &Pdu) -> Vec<u8> {
    let mut body = BytesMut::new();
    match pdu {
        Pdu::AssociateRq(rq) => {
            put_association_header(&mut body, &rq.called_ae, &rq.calling_ae);
            put_item(&mut body, ITEM_APPLICATION_CONTEXT, rq.application_context.as_bytes());
            for context in &rq.presentation_contexts {
                let mut item = BytesMut::new();
                item.put_u8(context.id);
                item.put_bytes(0, 3);
                put_item(&mut item, ITEM_ABSTRACT_SYNTAX, context.abstract_syntax.as_bytes());
                for ts in &context.transfer_syntaxes {
                    put_item(&mut item, ITEM_TRANSFER_SYNTAX, ts.as_bytes());
                }
                put_item(&mut body, ITEM_PRESENTATION_CONTEXT_RQ, &item);
            }
            put_user_information(&mut body, &rq.user_information);
        }
        Pdu::AssociateAc(ac) => {
            put_association_header(&mut body, &ac.called_ae, &ac.calling_ae);
            put_item(&mut body, ITEM_APPLICATION_CONTEXT, ac.application_context.as_bytes());
            for context in &ac.presentation_contexts {
                let mut item = BytesMut::new();
                item.put_u8(context.id);
                item.put_u8(0);
                item.put_u8(context.result);
                item.put_u8(0);
                put_item(&mut item, ITEM_TRANSFER_SYNTAX, context.transfer_syntax.as_bytes());
                put_item(&mut body, ITEM_PRESENTATION_CONTEXT_AC, &item);
            }
            put_user_information(&mut body, &ac.user_information);
        }
        Pdu::AssociateRj {
            result,
            source,
            reason,
        } => {
            body.put_u8(0);
            body.put_u8(*result);
            body.put_u8(*source);
            body.put_u8(*reason);
        }
        Pdu::PData(values) => {
            for pdv in values {
                body.put_u32(pdv.data.len() as u32 + 2);
                body.put_u8(pdv.context_id);
                body.put_u8(u8::from(pdv.is_command) | (u8::from(pdv.is_last) << 1));
                body.put_slice(&pdv.data);
            }
        }
        Pdu::ReleaseRq | Pdu::ReleaseRp => body.put_bytes(0, 4),
        Pdu::Abort { source, reason } => {
            body.put_bytes(0, 2);
            body.put_u8(*source);
            body.put_u8(*reason);
        }
    }

    let mut out = Vec::with_capacity(PDU_HEADER_LEN + body.len());
    out.put_u8(pdu.type_code());
    out.put_u8(0);
    out.put_u32(body.len() as u32);
    out.put_slice(&body);
    out
}

fn put_association_header(buf: &mut BytesMut, called_ae: &str, calling_ae: &str) {
    buf.put_u16(PROTOCOL_VERSION);
    buf.put_u16(0);
    buf.put_slice(&ae_title_bytes(called_ae));
    buf.put_slice(&ae_title_bytes(calling_ae));
    buf.put_bytes(0, 32);
}

fn put_user_information(buf: &mut BytesMut, info: &UserInformation) {
    let mut item = BytesMut::new();
    put_item(&mut item, ITEM_MAX_LENGTH, &info.max_pdu_length.to_be_bytes());
    put_item(
        &mut item,
        ITEM_IMPLEMENTATION_CLASS_UID,
        info.implementation_class_uid.as_bytes(),
    );
    if let Some(name) = &info.implementation_version_name {
        put_item(&mut item, ITEM_IMPLEMENTATION_VERSION_NAME, name.as_bytes());
    }
    put_item(buf, ITEM_USER_INFORMATION, &item);
}

fn put_item(buf: &mut BytesMut, item_type: u8, value: &[u8]) {
    buf.put_u8(item_type);
    buf.put_u8(0);
    buf.put_u16(value.len() as u16);
    buf.put_slice(value);
}

fn ae_title_bytes(title: &str) -> [u8; AE_TITLE_LEN] {
    let mut out = [b' '; AE_TITLE_LEN];
    for (slot, byte) in out.iter_mut().zip(title.bytes()) {
        *slot = byte;
    }
    out
}

/// Decode a PDU body given its type code.
pub fn decode(pdu_type: u8, body: &[u8]) -> Result<Pdu, PduError> {
    let mut buf = body;
    match pdu_type {
        0x01 | 0x02 => decode_association(pdu_type, &mut buf),
        0x03 => {
            need(&buf, 4, "A-ASSOCIATE-RJ")?;
            buf.advance(1);
            Ok(Pdu::AssociateRj {
                result: buf.get_u8(),
                source: buf.get_u8(),
                reason: buf.get_u8(),
            })
        }
        0x04 => {
            let mut values = Vec::new();
            while buf.has_remaining() {
                need(&buf, 6, "PDV item")?;
                let length = buf.get_u32() as usize;
                if length < 2 {
                    return Err(PduError::Malformed(format!("PDV length {}", length)));
                }
                need(&buf, length, "PDV value")?;
                let context_id = buf.get_u8();
                let control = buf.get_u8();
                let data = buf[..length - 2].to_vec();
                buf.advance(length - 2);
                values.push(Pdv {
                    context_id,
                    is_command: control & 0x01 != 0,
                    is_last: control & 0x02 != 0,
                    data,
                });
            }
            Ok(Pdu::PData(values))
        }
        0x05 => Ok(Pdu::ReleaseRq),
        0x06 => Ok(Pdu::ReleaseRp),
        0x07 => {
            need(&buf, 4, "A-ABORT")?;
            buf.advance(2);
            Ok(Pdu::Abort {
                source: buf.get_u8(),
                reason: buf.get_u8(),
            })
        }
        other => Err(PduError::UnknownType(other)),
    }
}

fn need(buf: &&[u8], len: usize, what: &str) -> Result<(), PduError> {
    if buf.remaining() < len {
        return Err(PduError::Malformed(format!("truncated {}", what)));
    }
    Ok(())
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == '\0' || c == ' ')
        .to_string()
}

fn decode_association(pdu_type: u8, buf: &mut &[u8]) -> Result<Pdu, PduError> {
    need(buf, 68, "association header")?;
    buf.advance(4); // protocol version + reserved
    let called_ae = text(&buf[..AE_TITLE_LEN]);
    buf.advance(AE_TITLE_LEN);
    let calling_ae = text(&buf[..AE_TITLE_LEN]);
    buf.advance(AE_TITLE_LEN);
    buf.advance(32);

    let mut application_context = String::new();
    let mut proposals = Vec::new();
    let mut results = Vec::new();
    let mut user_information = UserInformation {
        max_pdu_length: 0,
        implementation_class_uid: String::new(),
        implementation_version_name: None,
    };

    while buf.has_remaining() {
        let (item_type, mut item) = take_item(buf)?;
        match item_type {
            ITEM_APPLICATION_CONTEXT => application_context = text(item),
            ITEM_PRESENTATION_CONTEXT_RQ => {
                need(&item, 4, "presentation context")?;
                let id = item.get_u8();
                item.advance(3);
                let mut proposal = PresentationContextProposal {
                    id,
                    abstract_syntax: String::new(),
                    transfer_syntaxes: Vec::new(),
                };
                while item.has_remaining() {
                    let (sub_type, value) = take_item(&mut item)?;
                    match sub_type {
                        ITEM_ABSTRACT_SYNTAX => proposal.abstract_syntax = text(value),
                        ITEM_TRANSFER_SYNTAX => proposal.transfer_syntaxes.push(text(value)),
                        _ => {}
                    }
                }
                proposals.push(proposal);
            }
            ITEM_PRESENTATION_CONTEXT_AC => {
                need(&item, 4, "presentation context")?;
                let id = item.get_u8();
                item.advance(1);
                let result = item.get_u8();
                item.advance(1);
                let mut transfer_syntax = String::new();
                while item.has_remaining() {
                    let (sub_type, value) = take_item(&mut item)?;
                    if sub_type == ITEM_TRANSFER_SYNTAX {
                        transfer_syntax = text(value);
                    }
                }
                results.push(PresentationContextResult {
                    id,
                    result,
                    transfer_syntax,
                });
            }
            ITEM_USER_INFORMATION => {
                while item.has_remaining() {
                    let (sub_type, mut value) = take_item(&mut item)?;
                    match sub_type {
                        ITEM_MAX_LENGTH => {
                            need(&value, 4, "maximum length")?;
                            user_information.max_pdu_length = value.get_u32();
                        }
                        ITEM_IMPLEMENTATION_CLASS_UID => {
                            user_information.implementation_class_uid = text(value);
                        }
                        ITEM_IMPLEMENTATION_VERSION_NAME => {
                            user_information.implementation_version_name = Some(text(value));
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if pdu_type == 0x01 {
        Ok(Pdu::AssociateRq(AssociateRq {
            called_ae,
            calling_ae,
            application_context,
            presentation_contexts: proposals,
            user_information,
        }))
    } else {
        Ok(Pdu::AssociateAc(AssociateAc {
            called_ae,
            calling_ae,
            application_context,
            presentation_contexts: results,
            user_information,
        }))
    }
}

fn take_item<'a>(buf: &mut &'a [u8]) -> Result<(u8, &'a [u8]), PduError> {
    need(buf, 4, "item header")?;
    let item_type = buf.get_u8();
    buf.advance(1);
    let length = usize::from(buf.get_u16());
    need(buf, length, "item value")?;
    let data: &'a [u8] = *buf;
    let (value, rest) = data.split_at(length);
    *buf = rest;
    Ok((item_type, value))
}

/// Read one PDU, rejecting bodies larger than `max_length`.
pub async fn read_pdu<R>(reader: &mut R, max_length: u32) -> Result<Pdu, PduError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; PDU_HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let pdu_type = header[0];
    let length = u32::from_be_bytes([header[2], header[3], header[4], header[5]]);
    if length > max_length {
        return Err(PduError::TooLarge {
            length,
            max: max_length,
        });
    }
    let mut body = vec![0u8; length as usize];
    reader.read_exact(&mut body).await?;
    decode(pdu_type, &body)
}

pub async fn write_pdu<W>(writer: &mut W, pdu: &Pdu) -> Result<(), PduError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(pdu)).await?;
    writer.flush().await?;
    Ok(())
}
