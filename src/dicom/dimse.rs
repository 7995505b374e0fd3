//! C-STORE command sets (PS3.7), always encoded as implicit VR little endian.

use crate::dicom::part10::{self, LoadError};
use crate::dicom::uids;
use crate::models::{DataSet, Element, Tag, Value, Vr};
use bytes::BufMut;

pub const C_STORE_RQ: u16 = 0x0001;
pub const C_STORE_RSP: u16 = 0x8001;

/// Command Data Set Type value meaning "a data set follows".
const DATA_SET_PRESENT: u16 = 0x0000;
const NO_DATA_SET: u16 = 0x0101;
const PRIORITY_MEDIUM: u16 = 0x0000;

pub const AFFECTED_SOP_CLASS_UID: Tag = Tag(0x0000, 0x0002);
pub const COMMAND_FIELD: Tag = Tag(0x0000, 0x0100);
pub const MESSAGE_ID: Tag = Tag(0x0000, 0x0110);
pub const MESSAGE_ID_BEING_RESPONDED_TO: Tag = Tag(0x0000, 0x0120);
pub const PRIORITY: Tag = Tag(0x0000, 0x0700);
pub const COMMAND_DATA_SET_TYPE: Tag = Tag(0x0000, 0x0800);
pub const STATUS: Tag = Tag(0x0000, 0x0900);
pub const ERROR_COMMENT: Tag = Tag(0x0000, 0x0902);
pub const AFFECTED_SOP_INSTANCE_UID: Tag = Tag(0x0000, 0x1000);

/// Outcome category of a DIMSE status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Warning,
    Failure,
}

pub fn classify_status(status: u16) -> StatusKind {
    match status {
        0x0000 => StatusKind::Success,
        0x0001 | 0x0107 | 0x0116 => StatusKind::Warning,
        s if s & 0xF000 == 0xB000 => StatusKind::Warning,
        _ => StatusKind::Failure,
    }
}

/// Decoded C-STORE-RSP fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResponse {
    pub message_id_being_responded_to: u16,
    pub status: u16,
    pub error_comment: Option<String>,
}

pub fn c_store_rq(message_id: u16, sop_class_uid: &str, sop_instance_uid: &str) -> Vec<u8> {
    let mut set = DataSet::new();
    set.put_text(AFFECTED_SOP_CLASS_UID, Vr::UI, sop_class_uid);
    set.put_u16(COMMAND_FIELD, C_STORE_RQ);
    set.put_u16(MESSAGE_ID, message_id);
    set.put_u16(PRIORITY, PRIORITY_MEDIUM);
    set.put_u16(COMMAND_DATA_SET_TYPE, DATA_SET_PRESENT);
    set.put_text(AFFECTED_SOP_INSTANCE_UID, Vr::UI, sop_instance_uid);
    encode_command(&set)
}

pub fn c_store_rsp(
    message_id_being_responded_to: u16,
    sop_class_uid: &str,
    sop_instance_uid: &str,
    status: u16,
) -> Vec<u8> {
    let mut set = DataSet::new();
    set.put_text(AFFECTED_SOP_CLASS_UID, Vr::UI, sop_class_uid);
    set.put_u16(COMMAND_FIELD, C_STORE_RSP);
    set.put_u16(MESSAGE_ID_BEING_RESPONDED_TO, message_id_being_responded_to);
    set.put_u16(COMMAND_DATA_SET_TYPE, NO_DATA_SET);
    set.put_u16(STATUS, status);
    set.put_text(AFFECTED_SOP_INSTANCE_UID, Vr::UI, sop_instance_uid);
    encode_command(&set)
}

/// Encode a command set with its (0000,0000) group length.
fn encode_command(set: &DataSet) -> Vec<u8> {
    let body = part10::encode_dataset(set, false);
    let mut out = Vec::with_capacity(body.len() + 12);
    out.put_u16_le(0x0000);
    out.put_u16_le(0x0000);
    out.put_u32_le(4);
    out.put_u32_le(body.len() as u32);
    out.put_slice(&body);
    out
}

pub fn decode_command(bytes: &[u8]) -> Result<DataSet, LoadError> {
    part10::read_dataset_bytes(bytes, uids::IMPLICIT_VR_LITTLE_ENDIAN)
}

pub fn command_field(command: &DataSet) -> Option<u16> {
    command.u16(COMMAND_FIELD)
}

/// Extract the response fields, or `None` if this is not a C-STORE-RSP.
pub fn parse_store_response(command: &DataSet) -> Option<StoreResponse> {
    if command_field(command)? != C_STORE_RSP {
        return None;
    }
    Some(StoreResponse {
        message_id_being_responded_to: command.u16(MESSAGE_ID_BEING_RESPONDED_TO)?,
        status: command.u16(STATUS)?,
        error_comment: command.string(ERROR_COMMENT).filter(|c| !c.is_empty()),
    })
}

/// Add an Error Comment to an encoded response (used by test peers).
pub fn with_error_comment(command: &[u8], comment: &str) -> Result<Vec<u8>, LoadError> {
    let mut set = decode_command(command)?;
    let mut bytes = comment.as_bytes().to_vec();
    if bytes.len() % 2 == 1 {
        bytes.push(b' ');
    }
    set.insert(Element::new(ERROR_COMMENT, Vr::LO, Value::Bytes(bytes)));
    Ok(encode_command(&set))
}
