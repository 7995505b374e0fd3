use indexmap::IndexMap;
use std::fmt;

/// A DICOM attribute tag `(group, element)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    pub const fn group(self) -> u16 {
        self.0
    }

    pub const fn element(self) -> u16 {
        self.1
    }

    /// Group length elements `(gggg,0000)` are recomputed by writers and never stored.
    pub const fn is_group_length(self) -> bool {
        self.1 == 0x0000
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

/// Well-known attribute tags used by the conversion pipeline.
pub mod tags {
    use super::Tag;

    pub const FILE_META_VERSION: Tag = Tag(0x0002, 0x0001);
    pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
    pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
    pub const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
    pub const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
    pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);

    pub const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);
    pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
    pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
    pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);

    pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
    pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
    pub const PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
    pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
    pub const ROWS: Tag = Tag(0x0028, 0x0010);
    pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
    pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
    pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
    pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
    pub const LOSSY_IMAGE_COMPRESSION: Tag = Tag(0x0028, 0x2110);
    pub const LOSSY_IMAGE_COMPRESSION_METHOD: Tag = Tag(0x0028, 0x2114);

    pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

    pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
    pub const ITEM_DELIMITATION: Tag = Tag(0xFFFE, 0xE00D);
    pub const SEQUENCE_DELIMITATION: Tag = Tag(0xFFFE, 0xE0DD);
}

/// Value representation of a data element.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vr {
    AE,
    AS,
    AT,
    CS,
    DA,
    DS,
    DT,
    FD,
    FL,
    IS,
    LO,
    LT,
    OB,
    OD,
    OF,
    OL,
    OV,
    OW,
    PN,
    SH,
    SL,
    SQ,
    SS,
    ST,
    SV,
    TM,
    UC,
    UI,
    UL,
    UN,
    UR,
    US,
    UT,
    UV,
}

impl Vr {
    pub fn from_bytes(code: [u8; 2]) -> Option<Self> {
        let vr = match &code {
            b"AE" => Vr::AE,
            b"AS" => Vr::AS,
            b"AT" => Vr::AT,
            b"CS" => Vr::CS,
            b"DA" => Vr::DA,
            b"DS" => Vr::DS,
            b"DT" => Vr::DT,
            b"FD" => Vr::FD,
            b"FL" => Vr::FL,
            b"IS" => Vr::IS,
            b"LO" => Vr::LO,
            b"LT" => Vr::LT,
            b"OB" => Vr::OB,
            b"OD" => Vr::OD,
            b"OF" => Vr::OF,
            b"OL" => Vr::OL,
            b"OV" => Vr::OV,
            b"OW" => Vr::OW,
            b"PN" => Vr::PN,
            b"SH" => Vr::SH,
            b"SL" => Vr::SL,
            b"SQ" => Vr::SQ,
            b"SS" => Vr::SS,
            b"ST" => Vr::ST,
            b"SV" => Vr::SV,
            b"TM" => Vr::TM,
            b"UC" => Vr::UC,
            b"UI" => Vr::UI,
            b"UL" => Vr::UL,
            b"UN" => Vr::UN,
            b"UR" => Vr::UR,
            b"US" => Vr::US,
            b"UT" => Vr::UT,
            b"UV" => Vr::UV,
            _ => return None,
        };
        Some(vr)
    }

    pub fn as_bytes(self) -> [u8; 2] {
        let code: &[u8; 2] = match self {
            Vr::AE => b"AE",
            Vr::AS => b"AS",
            Vr::AT => b"AT",
            Vr::CS => b"CS",
            Vr::DA => b"DA",
            Vr::DS => b"DS",
            Vr::DT => b"DT",
            Vr::FD => b"FD",
            Vr::FL => b"FL",
            Vr::IS => b"IS",
            Vr::LO => b"LO",
            Vr::LT => b"LT",
            Vr::OB => b"OB",
            Vr::OD => b"OD",
            Vr::OF => b"OF",
            Vr::OL => b"OL",
            Vr::OV => b"OV",
            Vr::OW => b"OW",
            Vr::PN => b"PN",
            Vr::SH => b"SH",
            Vr::SL => b"SL",
            Vr::SQ => b"SQ",
            Vr::SS => b"SS",
            Vr::ST => b"ST",
            Vr::SV => b"SV",
            Vr::TM => b"TM",
            Vr::UC => b"UC",
            Vr::UI => b"UI",
            Vr::UL => b"UL",
            Vr::UN => b"UN",
            Vr::UR => b"UR",
            Vr::US => b"US",
            Vr::UT => b"UT",
            Vr::UV => b"UV",
        };
        *code
    }

    /// Explicit VR encodings use a 2-byte reserved field and a 4-byte length for these VRs.
    pub fn has_long_length(self) -> bool {
        matches!(
            self,
            Vr::OB
                | Vr::OD
                | Vr::OF
                | Vr::OL
                | Vr::OV
                | Vr::OW
                | Vr::SQ
                | Vr::SV
                | Vr::UC
                | Vr::UN
                | Vr::UR
                | Vr::UT
                | Vr::UV
        )
    }

    /// VRs whose bytes are interpreted through the Specific Character Set.
    ///
    /// Everything else (codes, dates, numbers, UIDs, binary) uses the default
    /// repertoire or is not text at all and must never be re-encoded.
    pub fn is_charset_text(self) -> bool {
        matches!(
            self,
            Vr::SH | Vr::LO | Vr::ST | Vr::LT | Vr::PN | Vr::UC | Vr::UT
        )
    }

    /// Byte used to pad odd-length values.
    pub fn padding(self) -> u8 {
        match self {
            Vr::UI | Vr::OB | Vr::UN => 0x00,
            _ => b' ',
        }
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.as_bytes();
        write!(f, "{}{}", code[0] as char, code[1] as char)
    }
}

/// Payload of a data element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Raw little-endian value bytes exactly as stored.
    Bytes(Vec<u8>),
    /// Items of a sequence.
    Sequence(Vec<DataSet>),
    /// Encapsulated (compressed) pixel data: basic offset table and fragments.
    Encapsulated {
        offset_table: Vec<u8>,
        fragments: Vec<Vec<u8>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: Tag,
    pub vr: Vr,
    pub value: Value,
}

impl Element {
    pub fn new(tag: Tag, vr: Vr, value: Value) -> Self {
        Self { tag, vr, value }
    }

    /// Text element from a string, padded to even length.
    pub fn text(tag: Tag, vr: Vr, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        if bytes.len() % 2 == 1 {
            bytes.push(vr.padding());
        }
        Self::new(tag, vr, Value::Bytes(bytes))
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Ordered collection of data elements.
///
/// Elements are kept in ascending tag order, which is the order they are
/// written to files and to the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSet {
    elements: IndexMap<Tag, Element>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.elements.get(&tag)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    /// Insert or replace an element, keeping ascending tag order.
    pub fn insert(&mut self, element: Element) {
        let tag = element.tag;
        let out_of_order = self
            .elements
            .last()
            .is_some_and(|(last, _)| *last > tag && !self.elements.contains_key(&tag));
        self.elements.insert(tag, element);
        if out_of_order {
            self.elements.sort_keys();
        }
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Element> {
        self.elements.shift_remove(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.values_mut()
    }

    /// String value with trailing padding removed.
    pub fn string(&self, tag: Tag) -> Option<String> {
        let bytes = self.get(tag)?.bytes()?;
        let text = String::from_utf8_lossy(bytes);
        Some(text.trim_end_matches(['\0', ' ']).trim_start().to_string())
    }

    pub fn u16(&self, tag: Tag) -> Option<u16> {
        let bytes = self.get(tag)?.bytes()?;
        let raw: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
        Some(u16::from_le_bytes(raw))
    }

    /// Integer String (IS) value.
    pub fn int_string(&self, tag: Tag) -> Option<i64> {
        self.string(tag)?.split('\\').next()?.trim().parse().ok()
    }

    pub fn put_text(&mut self, tag: Tag, vr: Vr, text: &str) {
        self.insert(Element::text(tag, vr, text));
    }

    pub fn put_u16(&mut self, tag: Tag, value: u16) {
        self.insert(Element::new(
            tag,
            Vr::US,
            Value::Bytes(value.to_le_bytes().to_vec()),
        ));
    }
}

impl FromIterator<Element> for DataSet {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut set = DataSet::new();
        for element in iter {
            set.insert(element);
        }
        set
    }
}

/// One loaded DICOM file: file meta information plus the main data set.
///
/// The transfer syntax UID in the file meta is the encoding declaration for
/// the data set; every step that changes the pixel encoding must update it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub meta: DataSet,
    pub dataset: DataSet,
}

impl Artifact {
    pub fn new(meta: DataSet, dataset: DataSet) -> Self {
        Self { meta, dataset }
    }

    pub fn transfer_syntax(&self) -> String {
        self.meta
            .string(tags::TRANSFER_SYNTAX_UID)
            .unwrap_or_default()
    }

    pub fn set_transfer_syntax(&mut self, uid: &str) {
        self.meta.put_text(tags::TRANSFER_SYNTAX_UID, Vr::UI, uid);
    }

    pub fn sop_class_uid(&self) -> Option<String> {
        self.dataset
            .string(tags::SOP_CLASS_UID)
            .or_else(|| self.meta.string(tags::MEDIA_STORAGE_SOP_CLASS_UID))
            .filter(|uid| !uid.is_empty())
    }

    pub fn sop_instance_uid(&self) -> Option<String> {
        self.dataset
            .string(tags::SOP_INSTANCE_UID)
            .or_else(|| self.meta.string(tags::MEDIA_STORAGE_SOP_INSTANCE_UID))
            .filter(|uid| !uid.is_empty())
    }

    /// Current Specific Character Set declaration, if any.
    pub fn specific_character_set(&self) -> Option<String> {
        self.dataset.string(tags::SPECIFIC_CHARACTER_SET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_ascending_order() {
        let mut set = DataSet::new();
        set.put_text(tags::PATIENT_NAME, Vr::PN, "DOE^JOHN");
        set.put_text(tags::SOP_INSTANCE_UID, Vr::UI, "1.2.3");
        set.put_u16(tags::ROWS, 4);
        set.put_text(tags::SPECIFIC_CHARACTER_SET, Vr::CS, "ISO_IR 192");

        let order: Vec<Tag> = set.iter().map(|e| e.tag).collect();
        assert_eq!(
            order,
            vec![
                tags::SPECIFIC_CHARACTER_SET,
                tags::SOP_INSTANCE_UID,
                tags::PATIENT_NAME,
                tags::ROWS
            ]
        );
    }

    #[test]
    fn test_text_padding() {
        let odd = Element::text(tags::SOP_INSTANCE_UID, Vr::UI, "1.2.3");
        assert_eq!(odd.bytes().unwrap(), b"1.2.3\0");

        let name = Element::text(tags::PATIENT_NAME, Vr::PN, "ABC");
        assert_eq!(name.bytes().unwrap(), b"ABC ");
    }

    #[test]
    fn test_string_trims_padding() {
        let mut set = DataSet::new();
        set.put_text(tags::SOP_CLASS_UID, Vr::UI, "1.2.840.10008.5.1.4.1.1.7");
        assert_eq!(
            set.string(tags::SOP_CLASS_UID).unwrap(),
            "1.2.840.10008.5.1.4.1.1.7"
        );
    }

    #[test]
    fn test_int_string_first_value() {
        let mut set = DataSet::new();
        set.put_text(tags::NUMBER_OF_FRAMES, Vr::IS, "3 ");
        assert_eq!(set.int_string(tags::NUMBER_OF_FRAMES), Some(3));
    }

    #[test]
    fn test_vr_round_trip_codes() {
        for vr in [Vr::PN, Vr::OB, Vr::SQ, Vr::UT, Vr::UN] {
            assert_eq!(Vr::from_bytes(vr.as_bytes()), Some(vr));
        }
        assert_eq!(Vr::from_bytes(*b"ZZ"), None);
    }

    #[test]
    fn test_charset_text_vrs() {
        assert!(Vr::PN.is_charset_text());
        assert!(Vr::LO.is_charset_text());
        assert!(!Vr::DA.is_charset_text());
        assert!(!Vr::UI.is_charset_text());
        assert!(!Vr::OW.is_charset_text());
        assert!(!Vr::CS.is_charset_text());
    }

    #[test]
    fn test_sop_uids_fall_back_to_meta() {
        let mut meta = DataSet::new();
        meta.put_text(tags::MEDIA_STORAGE_SOP_CLASS_UID, Vr::UI, "1.2.3");
        meta.put_text(tags::MEDIA_STORAGE_SOP_INSTANCE_UID, Vr::UI, "4.5.6");
        let artifact = Artifact::new(meta, DataSet::new());

        assert_eq!(artifact.sop_class_uid().as_deref(), Some("1.2.3"));
        assert_eq!(artifact.sop_instance_uid().as_deref(), Some("4.5.6"));
    }
}
