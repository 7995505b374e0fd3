//! DICOM Part 10 file reading and data set encoding.
//!
//! Supports the little endian transfer syntaxes: implicit VR, explicit VR and
//! every encapsulated syntax. Deflated and big endian files are rejected.

use crate::dicom::{dictionary, uids};
use crate::models::{Artifact, DataSet, Element, Tag, Value, Vr, tags};
use bytes::BufMut;
use camino::Utf8Path;
use thiserror::Error;

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";
const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// Errors that can occur while loading a file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a DICOM Part 10 file (missing DICM prefix)")]
    NotDicom,

    #[error("Unexpected end of data at offset {0}")]
    Truncated(usize),

    #[error("File meta information has no Transfer Syntax UID")]
    MissingTransferSyntax,

    #[error("Unsupported transfer syntax: {0}")]
    UnsupportedTransferSyntax(String),

    #[error("Malformed element {tag} at offset {offset}: {reason}")]
    Malformed {
        tag: Tag,
        offset: usize,
        reason: String,
    },
}

/// Read and parse a Part 10 file.
pub async fn load_file(path: &Utf8Path) -> Result<Artifact, LoadError> {
    let data = tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_string(),
        source,
    })?;
    read_bytes(&data)
}

/// Parse a complete Part 10 byte stream.
pub fn read_bytes(data: &[u8]) -> Result<Artifact, LoadError> {
    if data.len() < PREAMBLE_LEN + MAGIC.len() || &data[PREAMBLE_LEN..PREAMBLE_LEN + 4] != MAGIC {
        return Err(LoadError::NotDicom);
    }

    let mut cursor = Cursor::new(data, PREAMBLE_LEN + MAGIC.len());

    // File meta group is always explicit VR little endian.
    let mut meta = DataSet::new();
    while cursor.peek_group() == Some(0x0002) {
        if let Some(element) = read_element(&mut cursor, true)? {
            meta.insert(element);
        }
    }

    let transfer_syntax = meta
        .string(tags::TRANSFER_SYNTAX_UID)
        .filter(|uid| !uid.is_empty())
        .ok_or(LoadError::MissingTransferSyntax)?;
    let explicit = explicit_vr_for(&transfer_syntax)?;

    let dataset = read_dataset(&mut cursor, explicit, Until::End)?;
    Ok(Artifact::new(meta, dataset))
}

/// Parse a bare data set (no preamble or file meta), e.g. one received over the network.
pub fn read_dataset_bytes(data: &[u8], transfer_syntax: &str) -> Result<DataSet, LoadError> {
    let explicit = explicit_vr_for(transfer_syntax)?;
    read_dataset(&mut Cursor::new(data, 0), explicit, Until::End)
}

fn explicit_vr_for(transfer_syntax: &str) -> Result<bool, LoadError> {
    if transfer_syntax == uids::IMPLICIT_VR_LITTLE_ENDIAN {
        Ok(false)
    } else if uids::is_explicit_little_endian(transfer_syntax) {
        Ok(true)
    } else {
        Err(LoadError::UnsupportedTransferSyntax(
            transfer_syntax.to_string(),
        ))
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], LoadError> {
        if self.remaining() < len {
            return Err(LoadError::Truncated(self.pos));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, LoadError> {
        let raw = self.take(2)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    fn u32(&mut self) -> Result<u32, LoadError> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn tag(&mut self) -> Result<Tag, LoadError> {
        Ok(Tag(self.u16()?, self.u16()?))
    }

    fn peek_group(&self) -> Option<u16> {
        let raw = self.data.get(self.pos..self.pos + 2)?;
        Some(u16::from_le_bytes([raw[0], raw[1]]))
    }
}

#[derive(Clone, Copy)]
enum Until {
    End,
    Offset(usize),
    ItemDelimiter,
}

fn read_dataset(cursor: &mut Cursor<'_>, explicit: bool, until: Until) -> Result<DataSet, LoadError> {
    let mut set = DataSet::new();
    loop {
        match until {
            Until::End if cursor.remaining() == 0 => break,
            Until::Offset(end) if cursor.pos >= end => break,
            Until::ItemDelimiter if cursor.remaining() == 0 => {
                return Err(LoadError::Truncated(cursor.pos));
            }
            _ => {}
        }

        let start = cursor.pos;
        let tag = cursor.tag()?;
        if tag == tags::ITEM_DELIMITATION {
            cursor.u32()?;
            if matches!(until, Until::ItemDelimiter) {
                break;
            }
            return Err(LoadError::Malformed {
                tag,
                offset: start,
                reason: "unexpected item delimiter".to_string(),
            });
        }
        cursor.pos = start;

        if let Some(element) = read_element(cursor, explicit)? {
            set.insert(element);
        }
    }
    Ok(set)
}

/// Read one element. Group length elements are consumed and dropped.
fn read_element(cursor: &mut Cursor<'_>, explicit: bool) -> Result<Option<Element>, LoadError> {
    let offset = cursor.pos;
    let tag = cursor.tag()?;

    let (mut vr, length) = if explicit {
        let code = cursor.take(2)?;
        let vr = Vr::from_bytes([code[0], code[1]]).ok_or_else(|| LoadError::Malformed {
            tag,
            offset,
            reason: format!("unknown VR {:?}", String::from_utf8_lossy(code)),
        })?;
        let length = if vr.has_long_length() {
            cursor.take(2)?;
            cursor.u32()?
        } else {
            u32::from(cursor.u16()?)
        };
        (vr, length)
    } else {
        (dictionary::implicit_vr(tag), cursor.u32()?)
    };

    let value = if tag == tags::PIXEL_DATA && length == UNDEFINED_LENGTH {
        read_encapsulated(cursor)?
    } else if vr == Vr::SQ || length == UNDEFINED_LENGTH {
        // Items of an undefined length UN are implicit VR.
        let items_explicit = explicit && vr != Vr::UN;
        vr = Vr::SQ;
        Value::Sequence(read_sequence(cursor, items_explicit, length)?)
    } else if vr == Vr::UN {
        let (resolved, value) = resolve_unknown(tag, cursor.take(length as usize)?);
        vr = resolved;
        value
    } else {
        Value::Bytes(cursor.take(length as usize)?.to_vec())
    };

    if tag.is_group_length() {
        return Ok(None);
    }
    Ok(Some(Element::new(tag, vr, value)))
}

/// Recover the VR of an element stored as UN.
///
/// Known tags get their dictionary VR when the value fits it. A sequence
/// hidden in UN is parsed as implicit VR little endian items; if that fails
/// the bytes are kept as they are.
fn resolve_unknown(tag: Tag, bytes: &[u8]) -> (Vr, Value) {
    let known = dictionary::lookup(tag);
    let starts_with_item = bytes.len() >= 8 && bytes[..4] == [0xFE, 0xFF, 0x00, 0xE0];
    if known == Some(Vr::SQ) || (known.is_none() && starts_with_item) {
        if let Ok(items) = read_sequence(&mut Cursor::new(bytes, 0), false, bytes.len() as u32) {
            return (Vr::SQ, Value::Sequence(items));
        }
    }
    let vr = match known {
        Some(vr) if vr != Vr::SQ && (vr.has_long_length() || bytes.len() <= usize::from(u16::MAX)) => vr,
        _ => Vr::UN,
    };
    (vr, Value::Bytes(bytes.to_vec()))
}

fn read_sequence(cursor: &mut Cursor<'_>, explicit: bool, length: u32) -> Result<Vec<DataSet>, LoadError> {
    let end = (length != UNDEFINED_LENGTH).then(|| cursor.pos + length as usize);
    let mut items = Vec::new();
    loop {
        if let Some(end) = end {
            if cursor.pos >= end {
                break;
            }
        }
        let offset = cursor.pos;
        let tag = cursor.tag()?;
        let item_length = cursor.u32()?;
        match tag {
            tags::SEQUENCE_DELIMITATION if end.is_none() => break,
            tags::ITEM if item_length == UNDEFINED_LENGTH => {
                items.push(read_dataset(cursor, explicit, Until::ItemDelimiter)?);
            }
            tags::ITEM => {
                let item_end = cursor.pos + item_length as usize;
                if item_end > cursor.data.len() {
                    return Err(LoadError::Truncated(cursor.pos));
                }
                items.push(read_dataset(cursor, explicit, Until::Offset(item_end))?);
            }
            other => {
                return Err(LoadError::Malformed {
                    tag: other,
                    offset,
                    reason: "expected sequence item".to_string(),
                });
            }
        }
    }
    Ok(items)
}

fn read_encapsulated(cursor: &mut Cursor<'_>) -> Result<Value, LoadError> {
    let mut offset_table = None;
    let mut fragments = Vec::new();
    loop {
        let offset = cursor.pos;
        let tag = cursor.tag()?;
        let length = cursor.u32()?;
        match tag {
            tags::SEQUENCE_DELIMITATION => break,
            tags::ITEM if length != UNDEFINED_LENGTH => {
                let bytes = cursor.take(length as usize)?.to_vec();
                if offset_table.is_none() {
                    offset_table = Some(bytes);
                } else {
                    fragments.push(bytes);
                }
            }
            other => {
                return Err(LoadError::Malformed {
                    tag: other,
                    offset,
                    reason: "expected pixel data fragment".to_string(),
                });
            }
        }
    }
    Ok(Value::Encapsulated {
        offset_table: offset_table.unwrap_or_default(),
        fragments,
    })
}

/// Encode a data set without preamble or meta information.
pub fn encode_dataset(set: &DataSet, explicit: bool) -> Vec<u8> {
    let mut buf = Vec::new();
    for element in set.iter() {
        write_element(&mut buf, element, explicit);
    }
    buf
}

/// Encode a data set in the given transfer syntax.
///
/// Callers only pass syntaxes accepted by [`read_bytes`], so anything that is
/// not implicit VR is written as explicit VR little endian.
pub fn encode_dataset_for(set: &DataSet, transfer_syntax: &str) -> Vec<u8> {
    encode_dataset(set, transfer_syntax != uids::IMPLICIT_VR_LITTLE_ENDIAN)
}

/// Encode a complete Part 10 file: preamble, file meta group and data set.
pub fn encode_file(artifact: &Artifact) -> Vec<u8> {
    let meta = encode_dataset(&artifact.meta, true);

    let mut buf = Vec::with_capacity(PREAMBLE_LEN + 16 + meta.len());
    buf.put_bytes(0, PREAMBLE_LEN);
    buf.put_slice(MAGIC);
    // (0002,0000) UL File Meta Information Group Length
    buf.put_u16_le(0x0002);
    buf.put_u16_le(0x0000);
    buf.put_slice(b"UL");
    buf.put_u16_le(4);
    buf.put_u32_le(meta.len() as u32);
    buf.put_slice(&meta);
    buf.put_slice(&encode_dataset_for(
        &artifact.dataset,
        &artifact.transfer_syntax(),
    ));
    buf
}

fn write_header(buf: &mut Vec<u8>, tag: Tag, vr: Vr, length: u32, explicit: bool) {
    buf.put_u16_le(tag.group());
    buf.put_u16_le(tag.element());
    if !explicit {
        buf.put_u32_le(length);
        return;
    }
    // Values too long for a 16-bit length field fall back to UN.
    let vr = if !vr.has_long_length() && length > u32::from(u16::MAX) {
        Vr::UN
    } else {
        vr
    };
    buf.put_slice(&vr.as_bytes());
    if vr.has_long_length() {
        buf.put_u16_le(0);
        buf.put_u32_le(length);
    } else {
        buf.put_u16_le(length as u16);
    }
}

fn write_item_header(buf: &mut Vec<u8>, tag: Tag, length: u32) {
    buf.put_u16_le(tag.group());
    buf.put_u16_le(tag.element());
    buf.put_u32_le(length);
}

fn write_element(buf: &mut Vec<u8>, element: &Element, explicit: bool) {
    match &element.value {
        Value::Bytes(bytes) => {
            let padded = bytes.len() % 2 == 1;
            let length = bytes.len() + usize::from(padded);
            write_header(buf, element.tag, element.vr, length as u32, explicit);
            buf.put_slice(bytes);
            if padded {
                buf.put_u8(element.vr.padding());
            }
        }
        Value::Sequence(items) => {
            write_header(buf, element.tag, Vr::SQ, UNDEFINED_LENGTH, explicit);
            for item in items {
                write_item_header(buf, tags::ITEM, UNDEFINED_LENGTH);
                for nested in item.iter() {
                    write_element(buf, nested, explicit);
                }
                write_item_header(buf, tags::ITEM_DELIMITATION, 0);
            }
            write_item_header(buf, tags::SEQUENCE_DELIMITATION, 0);
        }
        Value::Encapsulated {
            offset_table,
            fragments,
        } => {
            write_header(buf, element.tag, Vr::OB, UNDEFINED_LENGTH, explicit);
            write_item_header(buf, tags::ITEM, offset_table.len() as u32);
            buf.put_slice(offset_table);
            for fragment in fragments {
                let padded = fragment.len() % 2 == 1;
                write_item_header(buf, tags::ITEM, (fragment.len() + usize::from(padded)) as u32);
                buf.put_slice(fragment);
                if padded {
                    buf.put_u8(0);
                }
            }
            write_item_header(buf, tags::SEQUENCE_DELIMITATION, 0);
        }
    }
}
