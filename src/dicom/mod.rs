//! DICOM capabilities the pipeline is built on.
//!
//! - [`part10`]: Part 10 file loading and data set encoding
//! - [`codec`]: pixel codec trait and the JPEG, JPEG-LS, JPEG 2000 and RLE encoders
//! - [`ul`]: Upper Layer PDUs for associations
//! - [`dimse`]: C-STORE command sets
//! - [`dictionary`]: standard VRs for implicit VR and UN elements
//! - [`uids`]: transfer syntax and protocol UIDs

pub mod codec;
pub mod dictionary;
pub mod dimse;
pub mod part10;
pub mod uids;
pub mod ul;

pub use codec::{
    CodecError, FrameLayout, Jpeg2000Codec, JpegBaselineCodec, JpegLsCodec, PixelCodec, RleCodec,
};
pub use part10::LoadError;
