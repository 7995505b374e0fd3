//! VR lookup for implicit VR data sets.
//!
//! Implicit VR files carry no VR on the wire, so text elements could not be
//! told apart from binary ones. The table holds every standard attribute
//! whose VR is text through the Specific Character Set (SH, LO, ST, LT, PN,
//! UC, UT) in the groups found in image, report and worklist objects, the
//! standard sequences that nest them, and the attributes the pipeline reads.
//! Anything else is UN and is passed through untouched.

use crate::models::{Tag, Vr};
use std::collections::HashMap;
use std::sync::LazyLock;

const ENTRIES: &[(u16, u16, Vr)] = &[
    // Identification
    (0x0008, 0x0005, Vr::CS), // Specific Character Set
    (0x0008, 0x0008, Vr::CS), // Image Type
    (0x0008, 0x0012, Vr::DA), // Instance Creation Date
    (0x0008, 0x0013, Vr::TM), // Instance Creation Time
    (0x0008, 0x0014, Vr::UI), // Instance Creator UID
    (0x0008, 0x0016, Vr::UI), // SOP Class UID
    (0x0008, 0x0018, Vr::UI), // SOP Instance UID
    (0x0008, 0x0020, Vr::DA), // Study Date
    (0x0008, 0x0021, Vr::DA), // Series Date
    (0x0008, 0x0022, Vr::DA), // Acquisition Date
    (0x0008, 0x0023, Vr::DA), // Content Date
    (0x0008, 0x002A, Vr::DT), // Acquisition DateTime
    (0x0008, 0x0030, Vr::TM), // Study Time
    (0x0008, 0x0031, Vr::TM), // Series Time
    (0x0008, 0x0032, Vr::TM), // Acquisition Time
    (0x0008, 0x0033, Vr::TM), // Content Time
    (0x0008, 0x0050, Vr::SH), // Accession Number
    (0x0008, 0x0051, Vr::SQ), // Issuer of Accession Number Sequence
    (0x0008, 0x0052, Vr::CS), // Query/Retrieve Level
    (0x0008, 0x0054, Vr::AE), // Retrieve AE Title
    (0x0008, 0x0056, Vr::CS), // Instance Availability
    (0x0008, 0x0060, Vr::CS), // Modality
    (0x0008, 0x0061, Vr::CS), // Modalities in Study
    (0x0008, 0x0064, Vr::CS), // Conversion Type
    (0x0008, 0x0068, Vr::CS), // Presentation Intent Type
    (0x0008, 0x0070, Vr::LO), // Manufacturer
    (0x0008, 0x0080, Vr::LO), // Institution Name
    (0x0008, 0x0081, Vr::ST), // Institution Address
    (0x0008, 0x0082, Vr::SQ), // Institution Code Sequence
    (0x0008, 0x0090, Vr::PN), // Referring Physician's Name
    (0x0008, 0x0092, Vr::ST), // Referring Physician's Address
    (0x0008, 0x0094, Vr::SH), // Referring Physician's Telephone Numbers
    (0x0008, 0x0096, Vr::SQ), // Referring Physician Identification Sequence
    (0x0008, 0x0100, Vr::SH), // Code Value
    (0x0008, 0x0102, Vr::SH), // Coding Scheme Designator
    (0x0008, 0x0103, Vr::SH), // Coding Scheme Version
    (0x0008, 0x0104, Vr::LO), // Code Meaning
    (0x0008, 0x0105, Vr::CS), // Mapping Resource
    (0x0008, 0x0201, Vr::SH), // Timezone Offset From UTC
    (0x0008, 0x1010, Vr::SH), // Station Name
    (0x0008, 0x1030, Vr::LO), // Study Description
    (0x0008, 0x1032, Vr::SQ), // Procedure Code Sequence
    (0x0008, 0x103E, Vr::LO), // Series Description
    (0x0008, 0x103F, Vr::SQ), // Series Description Code Sequence
    (0x0008, 0x1040, Vr::LO), // Institutional Department Name
    (0x0008, 0x1048, Vr::PN), // Physician(s) of Record
    (0x0008, 0x1049, Vr::SQ), // Physician(s) of Record Identification Sequence
    (0x0008, 0x1050, Vr::PN), // Performing Physician's Name
    (0x0008, 0x1052, Vr::SQ), // Performing Physician Identification Sequence
    (0x0008, 0x1060, Vr::PN), // Name of Physician(s) Reading Study
    (0x0008, 0x1062, Vr::SQ), // Physician(s) Reading Study Identification Sequence
    (0x0008, 0x1070, Vr::PN), // Operators' Name
    (0x0008, 0x1072, Vr::SQ), // Operator Identification Sequence
    (0x0008, 0x1080, Vr::LO), // Admitting Diagnoses Description
    (0x0008, 0x1084, Vr::SQ), // Admitting Diagnoses Code Sequence
    (0x0008, 0x1090, Vr::LO), // Manufacturer's Model Name
    (0x0008, 0x1110, Vr::SQ), // Referenced Study Sequence
    (0x0008, 0x1111, Vr::SQ), // Referenced Performed Procedure Step Sequence
    (0x0008, 0x1115, Vr::SQ), // Referenced Series Sequence
    (0x0008, 0x1120, Vr::SQ), // Referenced Patient Sequence
    (0x0008, 0x1140, Vr::SQ), // Referenced Image Sequence
    (0x0008, 0x1150, Vr::UI), // Referenced SOP Class UID
    (0x0008, 0x1155, Vr::UI), // Referenced SOP Instance UID
    (0x0008, 0x1160, Vr::IS), // Referenced Frame Number
    (0x0008, 0x1250, Vr::SQ), // Related Series Sequence
    (0x0008, 0x2111, Vr::ST), // Derivation Description
    (0x0008, 0x2112, Vr::SQ), // Source Image Sequence
    (0x0008, 0x4000, Vr::LT), // Identifying Comments
    (0x0008, 0x9215, Vr::SQ), // Derivation Code Sequence
    // Patient
    (0x0010, 0x0010, Vr::PN), // Patient's Name
    (0x0010, 0x0020, Vr::LO), // Patient ID
    (0x0010, 0x0021, Vr::LO), // Issuer of Patient ID
    (0x0010, 0x0022, Vr::CS), // Type of Patient ID
    (0x0010, 0x0024, Vr::SQ), // Issuer of Patient ID Qualifiers Sequence
    (0x0010, 0x0030, Vr::DA), // Patient's Birth Date
    (0x0010, 0x0032, Vr::TM), // Patient's Birth Time
    (0x0010, 0x0040, Vr::CS), // Patient's Sex
    (0x0010, 0x0050, Vr::SQ), // Patient's Insurance Plan Code Sequence
    (0x0010, 0x0101, Vr::SQ), // Patient's Primary Language Code Sequence
    (0x0010, 0x1000, Vr::LO), // Other Patient IDs
    (0x0010, 0x1001, Vr::PN), // Other Patient Names
    (0x0010, 0x1002, Vr::SQ), // Other Patient IDs Sequence
    (0x0010, 0x1005, Vr::PN), // Patient's Birth Name
    (0x0010, 0x1010, Vr::AS), // Patient's Age
    (0x0010, 0x1020, Vr::DS), // Patient's Size
    (0x0010, 0x1030, Vr::DS), // Patient's Weight
    (0x0010, 0x1040, Vr::LO), // Patient's Address
    (0x0010, 0x1060, Vr::PN), // Patient's Mother's Birth Name
    (0x0010, 0x1080, Vr::LO), // Military Rank
    (0x0010, 0x1081, Vr::LO), // Branch of Service
    (0x0010, 0x1090, Vr::LO), // Medical Record Locator
    (0x0010, 0x2000, Vr::LO), // Medical Alerts
    (0x0010, 0x2110, Vr::LO), // Allergies
    (0x0010, 0x2150, Vr::LO), // Country of Residence
    (0x0010, 0x2152, Vr::LO), // Region of Residence
    (0x0010, 0x2154, Vr::SH), // Patient's Telephone Numbers
    (0x0010, 0x2160, Vr::SH), // Ethnic Group
    (0x0010, 0x2180, Vr::SH), // Occupation
    (0x0010, 0x21A0, Vr::CS), // Smoking Status
    (0x0010, 0x21B0, Vr::LT), // Additional Patient History
    (0x0010, 0x21C0, Vr::US), // Pregnancy Status
    (0x0010, 0x21F0, Vr::LO), // Patient's Religious Preference
    (0x0010, 0x2201, Vr::LO), // Patient Species Description
    (0x0010, 0x2292, Vr::LO), // Patient Breed Description
    (0x0010, 0x2297, Vr::PN), // Responsible Person
    (0x0010, 0x2299, Vr::LO), // Responsible Organization
    (0x0010, 0x4000, Vr::LT), // Patient Comments
    // Clinical trial
    (0x0012, 0x0010, Vr::LO), // Clinical Trial Sponsor Name
    (0x0012, 0x0020, Vr::LO), // Clinical Trial Protocol ID
    (0x0012, 0x0021, Vr::LO), // Clinical Trial Protocol Name
    (0x0012, 0x0030, Vr::LO), // Clinical Trial Site ID
    (0x0012, 0x0031, Vr::LO), // Clinical Trial Site Name
    (0x0012, 0x0040, Vr::LO), // Clinical Trial Subject ID
    (0x0012, 0x0050, Vr::LO), // Clinical Trial Time Point ID
    (0x0012, 0x0051, Vr::ST), // Clinical Trial Time Point Description
    (0x0012, 0x0062, Vr::CS), // Patient Identity Removed
    (0x0012, 0x0063, Vr::LO), // De-identification Method
    (0x0012, 0x0064, Vr::SQ), // De-identification Method Code Sequence
    (0x0012, 0x0071, Vr::LO), // Clinical Trial Series ID
    (0x0012, 0x0072, Vr::LO), // Clinical Trial Series Description
    (0x0012, 0x0081, Vr::LO), // Clinical Trial Protocol Ethics Committee Name
    // Acquisition
    (0x0018, 0x0010, Vr::LO), // Contrast/Bolus Agent
    (0x0018, 0x0015, Vr::CS), // Body Part Examined
    (0x0018, 0x0050, Vr::DS), // Slice Thickness
    (0x0018, 0x0060, Vr::DS), // KVP
    (0x0018, 0x0088, Vr::DS), // Spacing Between Slices
    (0x0018, 0x1000, Vr::LO), // Device Serial Number
    (0x0018, 0x1004, Vr::LO), // Plate ID
    (0x0018, 0x1016, Vr::LO), // Secondary Capture Device Manufacturer
    (0x0018, 0x1018, Vr::LO), // Secondary Capture Device Manufacturer's Model Name
    (0x0018, 0x1020, Vr::LO), // Software Versions
    (0x0018, 0x1030, Vr::LO), // Protocol Name
    (0x0018, 0x1040, Vr::LO), // Contrast/Bolus Route
    (0x0018, 0x1400, Vr::LO), // Acquisition Device Processing Description
    (0x0018, 0x1401, Vr::LO), // Acquisition Device Processing Code
    (0x0018, 0x4000, Vr::LT), // Acquisition Comments
    (0x0018, 0x5100, Vr::CS), // Patient Position
    // Relationship
    (0x0020, 0x000D, Vr::UI), // Study Instance UID
    (0x0020, 0x000E, Vr::UI), // Series Instance UID
    (0x0020, 0x0010, Vr::SH), // Study ID
    (0x0020, 0x0011, Vr::IS), // Series Number
    (0x0020, 0x0012, Vr::IS), // Acquisition Number
    (0x0020, 0x0013, Vr::IS), // Instance Number
    (0x0020, 0x0020, Vr::CS), // Patient Orientation
    (0x0020, 0x0032, Vr::DS), // Image Position (Patient)
    (0x0020, 0x0037, Vr::DS), // Image Orientation (Patient)
    (0x0020, 0x0052, Vr::UI), // Frame of Reference UID
    (0x0020, 0x1040, Vr::LO), // Position Reference Indicator
    (0x0020, 0x4000, Vr::LT), // Image Comments
    // Image pixel
    (0x0028, 0x0002, Vr::US), // Samples per Pixel
    (0x0028, 0x0004, Vr::CS), // Photometric Interpretation
    (0x0028, 0x0006, Vr::US), // Planar Configuration
    (0x0028, 0x0008, Vr::IS), // Number of Frames
    (0x0028, 0x0010, Vr::US), // Rows
    (0x0028, 0x0011, Vr::US), // Columns
    (0x0028, 0x0030, Vr::DS), // Pixel Spacing
    (0x0028, 0x0034, Vr::IS), // Pixel Aspect Ratio
    (0x0028, 0x0100, Vr::US), // Bits Allocated
    (0x0028, 0x0101, Vr::US), // Bits Stored
    (0x0028, 0x0102, Vr::US), // High Bit
    (0x0028, 0x0103, Vr::US), // Pixel Representation
    (0x0028, 0x0301, Vr::CS), // Burned In Annotation
    (0x0028, 0x1050, Vr::DS), // Window Center
    (0x0028, 0x1051, Vr::DS), // Window Width
    (0x0028, 0x1052, Vr::DS), // Rescale Intercept
    (0x0028, 0x1053, Vr::DS), // Rescale Slope
    (0x0028, 0x1054, Vr::LO), // Rescale Type
    (0x0028, 0x1055, Vr::LO), // Window Center & Width Explanation
    (0x0028, 0x2110, Vr::CS), // Lossy Image Compression
    (0x0028, 0x2112, Vr::DS), // Lossy Image Compression Ratio
    (0x0028, 0x2114, Vr::CS), // Lossy Image Compression Method
    (0x0028, 0x3000, Vr::SQ), // Modality LUT Sequence
    (0x0028, 0x3003, Vr::LO), // LUT Explanation
    (0x0028, 0x3010, Vr::SQ), // VOI LUT Sequence
    // Study and visit
    (0x0032, 0x000A, Vr::CS), // Study Status ID
    (0x0032, 0x1032, Vr::PN), // Requesting Physician
    (0x0032, 0x1033, Vr::LO), // Requesting Service
    (0x0032, 0x1060, Vr::LO), // Requested Procedure Description
    (0x0032, 0x1064, Vr::SQ), // Requested Procedure Code Sequence
    (0x0032, 0x1070, Vr::LO), // Requested Contrast Agent
    (0x0032, 0x4000, Vr::LT), // Study Comments
    (0x0038, 0x0010, Vr::LO), // Admission ID
    (0x0038, 0x0050, Vr::LO), // Special Needs
    (0x0038, 0x0300, Vr::LO), // Current Patient Location
    (0x0038, 0x0400, Vr::LO), // Patient's Institution Residence
    (0x0038, 0x0500, Vr::LO), // Patient State
    (0x0038, 0x4000, Vr::LT), // Visit Comments
    // Procedure steps and structured reporting
    (0x0040, 0x0001, Vr::AE), // Scheduled Station AE Title
    (0x0040, 0x0002, Vr::DA), // Scheduled Procedure Step Start Date
    (0x0040, 0x0003, Vr::TM), // Scheduled Procedure Step Start Time
    (0x0040, 0x0006, Vr::PN), // Scheduled Performing Physician's Name
    (0x0040, 0x0007, Vr::LO), // Scheduled Procedure Step Description
    (0x0040, 0x0008, Vr::SQ), // Scheduled Protocol Code Sequence
    (0x0040, 0x0009, Vr::SH), // Scheduled Procedure Step ID
    (0x0040, 0x0010, Vr::SH), // Scheduled Station Name
    (0x0040, 0x0011, Vr::SH), // Scheduled Procedure Step Location
    (0x0040, 0x0012, Vr::LO), // Pre-Medication
    (0x0040, 0x0100, Vr::SQ), // Scheduled Procedure Step Sequence
    (0x0040, 0x0241, Vr::AE), // Performed Station AE Title
    (0x0040, 0x0242, Vr::SH), // Performed Station Name
    (0x0040, 0x0243, Vr::SH), // Performed Location
    (0x0040, 0x0244, Vr::DA), // Performed Procedure Step Start Date
    (0x0040, 0x0245, Vr::TM), // Performed Procedure Step Start Time
    (0x0040, 0x0253, Vr::SH), // Performed Procedure Step ID
    (0x0040, 0x0254, Vr::LO), // Performed Procedure Step Description
    (0x0040, 0x0260, Vr::SQ), // Performed Protocol Code Sequence
    (0x0040, 0x0275, Vr::SQ), // Request Attributes Sequence
    (0x0040, 0x0280, Vr::ST), // Comments on the Performed Procedure Step
    (0x0040, 0x08EA, Vr::SQ), // Measurement Units Code Sequence
    (0x0040, 0x1001, Vr::SH), // Requested Procedure ID
    (0x0040, 0x1002, Vr::LO), // Reason for the Requested Procedure
    (0x0040, 0x1003, Vr::SH), // Requested Procedure Priority
    (0x0040, 0x1004, Vr::LO), // Patient Transport Arrangements
    (0x0040, 0x1005, Vr::LO), // Requested Procedure Location
    (0x0040, 0x1010, Vr::PN), // Names of Intended Recipients of Results
    (0x0040, 0x1400, Vr::LT), // Requested Procedure Comments
    (0x0040, 0x2001, Vr::LO), // Reason for the Imaging Service Request
    (0x0040, 0x2016, Vr::LO), // Placer Order Number / Imaging Service Request
    (0x0040, 0x2017, Vr::LO), // Filler Order Number / Imaging Service Request
    (0x0040, 0x2400, Vr::LT), // Imaging Service Request Comments
    (0x0040, 0x3001, Vr::LO), // Confidentiality Constraint on Patient Data Description
    (0x0040, 0xA010, Vr::CS), // Relationship Type
    (0x0040, 0xA027, Vr::LO), // Verifying Organization
    (0x0040, 0xA032, Vr::DT), // Observation DateTime
    (0x0040, 0xA040, Vr::CS), // Value Type
    (0x0040, 0xA043, Vr::SQ), // Concept Name Code Sequence
    (0x0040, 0xA050, Vr::CS), // Continuity Of Content
    (0x0040, 0xA073, Vr::SQ), // Verifying Observer Sequence
    (0x0040, 0xA075, Vr::PN), // Verifying Observer Name
    (0x0040, 0xA088, Vr::SQ), // Verifying Observer Identification Code Sequence
    (0x0040, 0xA123, Vr::PN), // Person Name
    (0x0040, 0xA124, Vr::UI), // UID
    (0x0040, 0xA160, Vr::UT), // Text Value
    (0x0040, 0xA168, Vr::SQ), // Concept Code Sequence
    (0x0040, 0xA300, Vr::SQ), // Measured Value Sequence
    (0x0040, 0xA30A, Vr::DS), // Numeric Value
    (0x0040, 0xA370, Vr::SQ), // Referenced Request Sequence
    (0x0040, 0xA372, Vr::SQ), // Performed Procedure Code Sequence
    (0x0040, 0xA375, Vr::SQ), // Current Requested Procedure Evidence Sequence
    (0x0040, 0xA385, Vr::SQ), // Pertinent Other Evidence Sequence
    (0x0040, 0xA491, Vr::CS), // Completion Flag
    (0x0040, 0xA492, Vr::LO), // Completion Flag Description
    (0x0040, 0xA493, Vr::CS), // Verification Flag
    (0x0040, 0xA504, Vr::SQ), // Content Template Sequence
    (0x0040, 0xA730, Vr::SQ), // Content Sequence
    // Nuclear medicine
    (0x0054, 0x0016, Vr::SQ), // Radiopharmaceutical Information Sequence
    (0x0054, 0x0220, Vr::SQ), // View Code Sequence
    (0x0054, 0x0410, Vr::SQ), // Patient Orientation Code Sequence
    // Presentation state
    (0x0070, 0x0001, Vr::SQ), // Graphic Annotation Sequence
    (0x0070, 0x0002, Vr::CS), // Graphic Layer
    (0x0070, 0x0006, Vr::ST), // Unformatted Text Value
    (0x0070, 0x0008, Vr::SQ), // Text Object Sequence
    (0x0070, 0x0009, Vr::SQ), // Graphic Object Sequence
    (0x0070, 0x0060, Vr::SQ), // Graphic Layer Sequence
    (0x0070, 0x0068, Vr::LO), // Graphic Layer Description
    (0x0070, 0x0080, Vr::CS), // Content Label
    (0x0070, 0x0081, Vr::LO), // Content Description
    (0x0070, 0x0084, Vr::PN), // Content Creator's Name
    // Media
    (0x0088, 0x0130, Vr::SH), // Storage Media File-set ID
    (0x0088, 0x0140, Vr::UI), // Storage Media File-set UID
    (0x0088, 0x0200, Vr::SQ), // Icon Image Sequence
    (0x0088, 0x0904, Vr::LO), // Topic Title
    (0x0088, 0x0906, Vr::ST), // Topic Subject
    (0x0088, 0x0910, Vr::LO), // Topic Author
    (0x0088, 0x0912, Vr::LO), // Topic Keywords
    // Attribute modification
    (0x0400, 0x0550, Vr::SQ), // Modified Attributes Sequence
    (0x0400, 0x0561, Vr::SQ), // Original Attributes Sequence
    (0x0400, 0x0564, Vr::LO), // Source of Previous Values
    (0x0400, 0x0565, Vr::CS), // Reason for the Attribute Modification
    // Radiotherapy
    (0x3006, 0x0002, Vr::SH), // Structure Set Label
    (0x3006, 0x0004, Vr::LO), // Structure Set Name
    (0x3006, 0x0006, Vr::ST), // Structure Set Description
    (0x3006, 0x0020, Vr::SQ), // Structure Set ROI Sequence
    (0x3006, 0x0026, Vr::LO), // ROI Name
    (0x3006, 0x0028, Vr::ST), // ROI Description
    (0x3006, 0x0039, Vr::SQ), // ROI Contour Sequence
    (0x3006, 0x0080, Vr::SQ), // RT ROI Observations Sequence
    (0x3006, 0x0085, Vr::SH), // ROI Observation Label
    (0x3006, 0x0088, Vr::ST), // ROI Observation Description
    (0x3006, 0x00A6, Vr::PN), // ROI Interpreter
    (0x300A, 0x0002, Vr::SH), // RT Plan Label
    (0x300A, 0x0003, Vr::LO), // RT Plan Name
    (0x300A, 0x0004, Vr::ST), // RT Plan Description
    (0x300E, 0x0008, Vr::PN), // Reviewer Name
    // Results
    (0x4008, 0x010C, Vr::PN), // Interpretation Author
    (0x4008, 0x0115, Vr::LT), // Interpretation Diagnosis Description
    (0x4008, 0x0300, Vr::ST), // Impressions
    (0x4008, 0x4000, Vr::ST), // Results Comments
    // Overlays, repeated in the even groups 6000-601E
    (0x6000, 0x0010, Vr::US), // Overlay Rows
    (0x6000, 0x0011, Vr::US), // Overlay Columns
    (0x6000, 0x0022, Vr::LO), // Overlay Description
    (0x6000, 0x0040, Vr::CS), // Overlay Type
    (0x6000, 0x0050, Vr::SS), // Overlay Origin
    (0x6000, 0x0100, Vr::US), // Overlay Bits Allocated
    (0x6000, 0x0102, Vr::US), // Overlay Bit Position
    (0x6000, 0x1500, Vr::LO), // Overlay Label
    (0x6000, 0x3000, Vr::OW), // Overlay Data
    (0x7FE0, 0x0010, Vr::OW), // Pixel Data
];

static DICTIONARY: LazyLock<HashMap<Tag, Vr>> = LazyLock::new(|| {
    ENTRIES
        .iter()
        .map(|&(group, element, vr)| (Tag(group, element), vr))
        .collect()
});

/// Standard VR of a tag, if the dictionary knows it.
pub fn lookup(tag: Tag) -> Option<Vr> {
    if tag.is_group_length() {
        return Some(Vr::UL);
    }
    // Private creator elements (gggg,0010-00FF) in odd groups.
    if tag.group() % 2 == 1 && (0x0010..=0x00FF).contains(&tag.element()) {
        return Some(Vr::LO);
    }
    let group = match tag.group() {
        group @ 0x6000..=0x601E if group % 2 == 0 => 0x6000,
        group => group,
    };
    DICTIONARY.get(&Tag(group, tag.element())).copied()
}

/// VR for a tag in an implicit VR data set.
pub fn implicit_vr(tag: Tag) -> Vr {
    lookup(tag).unwrap_or(Vr::UN)
}
