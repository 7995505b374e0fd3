//! RLE Lossless (PS3.5 Annex G).

use super::{CodecError, FrameLayout, PixelCodec};
use crate::models::CompressionScheme;

/// One PackBits segment per byte plane, most significant byte first.
#[derive(Debug, Clone, Copy, Default)]
pub struct RleCodec;

const RLE_HEADER_LEN: usize = 64;
const RLE_MAX_SEGMENTS: usize = 15;

impl PixelCodec for RleCodec {
    fn scheme(&self) -> CompressionScheme {
        CompressionScheme::Rle
    }

    fn encode_frame(&self, layout: &FrameLayout, frame: &[u8]) -> Result<Vec<u8>, CodecError> {
        if layout.bits_allocated == 0 || layout.bits_allocated % 8 != 0 {
            return Err(CodecError::Layout(format!(
                "bits allocated {} is not a whole number of bytes",
                layout.bits_allocated
            )));
        }
        let bytes_per_sample = layout.bytes_per_sample();
        let samples = usize::from(layout.samples_per_pixel);
        let segment_count = samples * bytes_per_sample;
        if segment_count == 0 || segment_count > RLE_MAX_SEGMENTS {
            return Err(CodecError::Layout(format!(
                "{} samples of {} bytes need {} segments",
                samples, bytes_per_sample, segment_count
            )));
        }
        layout.check_frame(frame)?;

        let pixels = layout.pixel_count();
        let columns = usize::from(layout.columns);
        let mut segments = Vec::with_capacity(segment_count);
        let mut plane = vec![0u8; pixels];

        for sample in 0..samples {
            // Most significant byte first.
            for byte in (0..bytes_per_sample).rev() {
                for (pixel, slot) in plane.iter_mut().enumerate() {
                    let index = if layout.planar_configuration == 0 {
                        pixel * samples + sample
                    } else {
                        sample * pixels + pixel
                    };
                    *slot = frame[index * bytes_per_sample + byte];
                }

                let mut segment = Vec::new();
                for row in plane.chunks(columns.max(1)) {
                    packbits_encode(row, &mut segment);
                }
                if segment.len() % 2 == 1 {
                    segment.push(0);
                }
                segments.push(segment);
            }
        }

        let mut out = Vec::with_capacity(
            RLE_HEADER_LEN + segments.iter().map(Vec::len).sum::<usize>(),
        );
        out.extend_from_slice(&(segment_count as u32).to_le_bytes());
        let mut offset = RLE_HEADER_LEN;
        for index in 0..RLE_MAX_SEGMENTS {
            let value = if index < segments.len() {
                let current = offset;
                offset += segments[index].len();
                current as u32
            } else {
                0
            };
            out.extend_from_slice(&value.to_le_bytes());
        }
        for segment in &segments {
            out.extend_from_slice(segment);
        }
        Ok(out)
    }
}

/// PackBits-encode one row, appending to `out`.
pub fn packbits_encode(row: &[u8], out: &mut Vec<u8>) {
    let n = row.len();
    let mut i = 0;
    while i < n {
        let mut run = 1;
        while i + run < n && run < 128 && row[i + run] == row[i] {
            run += 1;
        }

        if run >= 2 {
            // Replicate run: header is 1 - run as a signed byte.
            out.push((257 - run) as u8);
            out.push(row[i]);
            i += run;
        } else {
            let start = i;
            i += 1;
            while i < n && i - start < 128 {
                if i + 1 < n && row[i] == row[i + 1] {
                    break;
                }
                i += 1;
            }
            out.push((i - start - 1) as u8);
            out.extend_from_slice(&row[start..i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::codec::test_layout as layout;
    use proptest::prelude::*;

    fn packbits_decode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < data.len() {
            let header = data[i] as i8;
            i += 1;
            if header >= 0 {
                let count = header as usize + 1;
                // Trailing pad byte of an odd-length segment.
                if i + count > data.len() {
                    break;
                }
                out.extend_from_slice(&data[i..i + count]);
                i += count;
            } else if header != -128 {
                if i >= data.len() {
                    break;
                }
                let count = (1 - header as isize) as usize;
                out.extend(std::iter::repeat_n(data[i], count));
                i += 1;
            }
        }
        out
    }

    fn segment(encoded: &[u8], index: usize) -> &[u8] {
        let count = u32::from_le_bytes(encoded[0..4].try_into().unwrap()) as usize;
        let offset_at = |i: usize| {
            u32::from_le_bytes(encoded[4 + i * 4..8 + i * 4].try_into().unwrap()) as usize
        };
        let start = offset_at(index);
        let end = if index + 1 < count {
            offset_at(index + 1)
        } else {
            encoded.len()
        };
        &encoded[start..end]
    }

    #[test]
    fn test_packbits_runs_and_literals() {
        let mut out = Vec::new();
        packbits_encode(&[7, 7, 7, 7, 1, 2, 3], &mut out);
        assert_eq!(out, vec![0xFD, 7, 0x02, 1, 2, 3]);
    }

    #[test]
    fn test_packbits_long_run_is_split() {
        let row = vec![5u8; 300];
        let mut out = Vec::new();
        packbits_encode(&row, &mut out);
        assert_eq!(packbits_decode(&out), row);
        assert_eq!(out[0], 0x81); // run of 128
    }

    #[test]
    fn test_rle_8bit_single_segment() {
        let frame = [0u8, 0, 0, 0, 9, 9, 9, 9];
        let encoded = RleCodec.encode_frame(&layout(2, 4, 1, 8), &frame).unwrap();

        assert_eq!(&encoded[0..4], &1u32.to_le_bytes());
        assert_eq!(&encoded[4..8], &64u32.to_le_bytes());
        let seg = segment(&encoded, 0);
        assert_eq!(&packbits_decode(seg)[..8], &frame);
    }

    #[test]
    fn test_rle_16bit_msb_segment_first() {
        // Two little endian pixels: 0x0102, 0x0304
        let frame = [0x02u8, 0x01, 0x04, 0x03];
        let encoded = RleCodec.encode_frame(&layout(1, 2, 1, 16), &frame).unwrap();

        assert_eq!(&encoded[0..4], &2u32.to_le_bytes());
        assert_eq!(&packbits_decode(segment(&encoded, 0))[..2], &[0x01, 0x03]);
        assert_eq!(&packbits_decode(segment(&encoded, 1))[..2], &[0x02, 0x04]);
    }

    #[test]
    fn test_rle_rgb_interleaved() {
        let frame = [10u8, 20, 30, 11, 21, 31];
        let encoded = RleCodec.encode_frame(&layout(1, 2, 3, 8), &frame).unwrap();

        assert_eq!(&encoded[0..4], &3u32.to_le_bytes());
        assert_eq!(&packbits_decode(segment(&encoded, 0))[..2], &[10, 11]);
        assert_eq!(&packbits_decode(segment(&encoded, 1))[..2], &[20, 21]);
        assert_eq!(&packbits_decode(segment(&encoded, 2))[..2], &[30, 31]);
    }

    #[test]
    fn test_rle_rejects_wrong_frame_size() {
        let result = RleCodec.encode_frame(&layout(2, 2, 1, 8), &[0u8; 3]);
        assert_eq!(
            result,
            Err(CodecError::FrameSize {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_rle_rejects_one_bit_data() {
        let result = RleCodec.encode_frame(&layout(8, 8, 1, 1), &[0u8; 8]);
        assert!(matches!(result, Err(CodecError::Layout(_))));
    }

    proptest! {
        #[test]
        fn prop_packbits_decodes_to_input(row in proptest::collection::vec(0u8..4, 0..600)) {
            let mut out = Vec::new();
            packbits_encode(&row, &mut out);
            prop_assert_eq!(packbits_decode(&out), row);
        }
    }
}
