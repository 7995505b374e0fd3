//! JPEG-LS Lossless (ITU-T T.87, NEAR = 0, default thresholds).
//!
//! Each component is coded in its own scan (ILV = 0), so planar and
//! interleaved frames take the same path.

use super::bits::BitWriter;
use super::{CodecError, FrameLayout, PixelCodec};
use crate::models::CompressionScheme;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOF55: u8 = 0xF7;
const SOS: u8 = 0xDA;

const RESET: i32 = 64;
const MIN_C: i32 = -128;
const MAX_C: i32 = 127;
const REGULAR_CONTEXTS: usize = 365;

const J: [u32; 32] = [
    0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 9, 10, 11, 12, 13,
    14, 15,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct JpegLsCodec;

impl PixelCodec for JpegLsCodec {
    fn scheme(&self) -> CompressionScheme {
        CompressionScheme::JpegLs
    }

    fn encode_frame(&self, layout: &FrameLayout, frame: &[u8]) -> Result<Vec<u8>, CodecError> {
        layout.check_frame(frame)?;
        layout.check_samples(2)?;

        let params = Parameters::new(u32::from(layout.bits_stored));
        let width = usize::from(layout.columns);
        let components = layout.samples_per_pixel as u8;

        let mut out = vec![0xFF, SOI];
        write_frame_header(&mut out, layout);
        for component in 0..components {
            write_scan_header(&mut out, component + 1);
            let samples = layout.component(frame, usize::from(component));
            let mut scan = ScanEncoder::new(params);
            for line in samples.chunks(width.max(1)) {
                scan.encode_line(line);
            }
            out.extend_from_slice(&scan.finish());
        }
        out.extend_from_slice(&[0xFF, EOI]);
        if out.len() % 2 == 1 {
            out.push(0);
        }
        Ok(out)
    }
}

fn write_frame_header(out: &mut Vec<u8>, layout: &FrameLayout) {
    let components = layout.samples_per_pixel as u8;
    out.extend_from_slice(&[0xFF, SOF55]);
    out.extend_from_slice(&(8 + 3 * u16::from(components)).to_be_bytes());
    out.push(layout.bits_stored as u8);
    out.extend_from_slice(&layout.rows.to_be_bytes());
    out.extend_from_slice(&layout.columns.to_be_bytes());
    out.push(components);
    for id in 1..=components {
        out.extend_from_slice(&[id, 0x11, 0]);
    }
}

fn write_scan_header(out: &mut Vec<u8>, component_id: u8) {
    out.extend_from_slice(&[0xFF, SOS]);
    out.extend_from_slice(&8u16.to_be_bytes());
    // Ns, component id and mapping table, NEAR, ILV, point transform
    out.extend_from_slice(&[1, component_id, 0, 0, 0, 0]);
}

/// Coding parameters derived from the sample precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parameters {
    max_val: i32,
    range: i32,
    qbpp: u32,
    limit: u32,
    t1: i32,
    t2: i32,
    t3: i32,
}

impl Parameters {
    fn new(precision: u32) -> Self {
        let max_val = (1i32 << precision) - 1;
        let range = max_val + 1;
        let bpp = precision.max(2);
        let clamp = |value: i32, low: i32| if value > max_val || value < low { low } else { value };

        let (t1, t2, t3) = if max_val >= 128 {
            let factor = (max_val.min(4095) + 128) / 256;
            let t1 = clamp(factor * (3 - 2) + 2, 1);
            let t2 = clamp(factor * (7 - 3) + 3, t1);
            let t3 = clamp(factor * (21 - 4) + 4, t2);
            (t1, t2, t3)
        } else {
            let factor = 256 / (max_val + 1);
            let t1 = clamp((3 / factor).max(2), 1);
            let t2 = clamp((7 / factor).max(3), t1);
            let t3 = clamp((21 / factor).max(4), t2);
            (t1, t2, t3)
        };

        Self {
            max_val,
            range,
            qbpp: precision,
            limit: 2 * (bpp + bpp.max(8)),
            t1,
            t2,
            t3,
        }
    }

    fn quantize(&self, d: i32) -> i32 {
        match d {
            d if d <= -self.t3 => -4,
            d if d <= -self.t2 => -3,
            d if d <= -self.t1 => -2,
            d if d < 0 => -1,
            0 => 0,
            d if d < self.t1 => 1,
            d if d < self.t2 => 2,
            d if d < self.t3 => 3,
            _ => 4,
        }
    }

    fn reduce(&self, error: i32) -> i32 {
        let mut error = error;
        if error < 0 {
            error += self.range;
        }
        if error >= (self.range + 1) / 2 {
            error -= self.range;
        }
        error
    }
}

#[derive(Debug, Clone, Copy)]
struct RegularContext {
    a: i32,
    b: i32,
    c: i32,
    n: i32,
}

impl RegularContext {
    fn golomb_k(&self) -> u32 {
        let mut k = 0;
        while (self.n << k) < self.a {
            k += 1;
        }
        k
    }

    fn update(&mut self, error: i32) {
        self.b += error;
        self.a += error.abs();
        if self.n == RESET {
            self.a >>= 1;
            self.b >>= 1;
            self.n >>= 1;
        }
        self.n += 1;

        if self.b <= -self.n {
            self.b += self.n;
            if self.c > MIN_C {
                self.c -= 1;
            }
            if self.b <= -self.n {
                self.b = -self.n + 1;
            }
        } else if self.b > 0 {
            self.b -= self.n;
            if self.c < MAX_C {
                self.c += 1;
            }
            if self.b > 0 {
                self.b = 0;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RunContext {
    a: i32,
    n: i32,
    nn: i32,
    ri_type: i32,
}

impl RunContext {
    fn golomb_k(&self) -> u32 {
        let temp = self.a + (self.n >> 1) * self.ri_type;
        let mut k = 0;
        while (self.n << k) < temp {
            k += 1;
        }
        k
    }

    fn map(&self, error: i32, k: u32) -> bool {
        (k == 0 && error > 0 && 2 * self.nn < self.n)
            || (error < 0 && 2 * self.nn >= self.n)
            || (error < 0 && k != 0)
    }

    fn update(&mut self, error: i32, mapped: i32) {
        if error < 0 {
            self.nn += 1;
        }
        self.a += (mapped + 1 - self.ri_type) >> 1;
        if self.n == RESET {
            self.a >>= 1;
            self.n >>= 1;
            self.nn >>= 1;
        }
        self.n += 1;
    }
}

/// Context state and bit output for one scan.
struct ScanEncoder {
    params: Parameters,
    regular: Vec<RegularContext>,
    run: [RunContext; 2],
    run_index: usize,
    previous: Vec<i32>,
    current: Vec<i32>,
    bits: BitWriter,
}

impl ScanEncoder {
    fn new(params: Parameters) -> Self {
        let a = ((params.range + 32) / 64).max(2);
        let run = |ri_type| RunContext {
            a,
            n: 1,
            nn: 0,
            ri_type,
        };
        Self {
            params,
            regular: vec![RegularContext { a, b: 0, c: 0, n: 1 }; REGULAR_CONTEXTS],
            run: [run(0), run(1)],
            run_index: 0,
            previous: Vec::new(),
            current: Vec::new(),
            bits: BitWriter::default(),
        }
    }

    /// Code one line. Lines are padded by one sample on each side:
    /// `line[0]` and `line[width + 1]` are the edge neighbours.
    fn encode_line(&mut self, samples: &[u16]) {
        let width = samples.len();
        if self.previous.len() != width + 2 {
            self.previous = vec![0; width + 2];
            self.current = vec![0; width + 2];
        }
        for (slot, &sample) in self.current[1..=width].iter_mut().zip(samples) {
            *slot = i32::from(sample);
        }
        self.previous[width + 1] = self.previous[width];
        self.current[0] = self.previous[1];

        let mut x = 1;
        while x <= width {
            let ra = self.current[x - 1];
            let rb = self.previous[x];
            let rc = self.previous[x - 1];
            let rd = self.previous[x + 1];

            let q1 = self.params.quantize(rd - rb);
            let q2 = self.params.quantize(rb - rc);
            let q3 = self.params.quantize(rc - ra);
            let qs = (q1 * 9 + q2) * 9 + q3;

            if qs == 0 {
                x += self.encode_run(x, width);
            } else {
                self.encode_regular(qs, self.current[x], ra, rb, rc);
                x += 1;
            }
        }

        std::mem::swap(&mut self.previous, &mut self.current);
    }

    fn encode_regular(&mut self, qs: i32, sample: i32, ra: i32, rb: i32, rc: i32) {
        let params = self.params;
        let sign = if qs < 0 { -1 } else { 1 };
        let context = &mut self.regular[qs.unsigned_abs() as usize];

        let predicted = if rc >= ra.max(rb) {
            ra.min(rb)
        } else if rc <= ra.min(rb) {
            ra.max(rb)
        } else {
            ra + rb - rc
        };
        let corrected = (predicted + sign * context.c).clamp(0, params.max_val);
        let error = params.reduce(sign * (sample - corrected));

        let k = context.golomb_k();
        let mapped = if k == 0 && 2 * context.b <= -context.n {
            if error >= 0 { 2 * error + 1 } else { -2 * (error + 1) }
        } else if error >= 0 {
            2 * error
        } else {
            -2 * error - 1
        };
        context.update(error);
        self.bits.golomb(mapped as u32, k, params.limit, params.qbpp);
    }

    /// Code a run starting at `x`; returns the number of samples consumed.
    fn encode_run(&mut self, x: usize, width: usize) -> usize {
        let run_value = self.current[x - 1];
        let mut length = 0;
        while x + length <= width && self.current[x + length] == run_value {
            length += 1;
        }
        let end_of_line = x + length > width;

        let mut remaining = length;
        while remaining >= 1 << J[self.run_index] {
            self.bits.put(1, 1);
            remaining -= 1 << J[self.run_index];
            if self.run_index < 31 {
                self.run_index += 1;
            }
        }
        if end_of_line {
            if remaining > 0 {
                self.bits.put(1, 1);
            }
            return length;
        }
        self.bits.put(0, 1);
        self.bits.put(remaining as u32, J[self.run_index]);

        let at = x + length;
        self.encode_interruption(self.current[at], run_value, self.previous[at]);
        if self.run_index > 0 {
            self.run_index -= 1;
        }
        length + 1
    }

    fn encode_interruption(&mut self, sample: i32, ra: i32, rb: i32) {
        let params = self.params;
        let (ri_type, error) = if ra == rb {
            (1, params.reduce(sample - ra))
        } else {
            let sign = if rb - ra < 0 { -1 } else { 1 };
            (0, params.reduce(sign * (sample - rb)))
        };

        let context = &mut self.run[ri_type];
        let k = context.golomb_k();
        let mapped = 2 * error.abs() - context.ri_type - i32::from(context.map(error, k));
        context.update(error, mapped);

        let limit = params.limit - J[self.run_index] - 1;
        self.bits.golomb(mapped as u32, k, limit, params.qbpp);
    }

    fn finish(self) -> Vec<u8> {
        self.bits.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dicom::codec::test_layout;
    use proptest::prelude::*;

    #[test]
    fn test_default_thresholds() {
        let eight = Parameters::new(8);
        assert_eq!((eight.t1, eight.t2, eight.t3), (3, 7, 21));
        assert_eq!(eight.limit, 32);

        let twelve = Parameters::new(12);
        assert_eq!((twelve.t1, twelve.t2, twelve.t3), (18, 67, 276));

        let sixteen = Parameters::new(16);
        assert_eq!((sixteen.t1, sixteen.t2, sixteen.t3), (18, 67, 276));
        assert_eq!(sixteen.limit, 64);
    }

    #[test]
    fn test_gradient_quantization() {
        let p = Parameters::new(8);
        let q: Vec<i32> = [-30, -21, -20, -7, -3, -1, 0, 1, 2, 3, 7, 20, 21]
            .iter()
            .map(|&d| p.quantize(d))
            .collect();
        assert_eq!(q, vec![-4, -4, -3, -3, -2, -1, 0, 1, 1, 2, 3, 3, 4]);
    }

    #[test]
    fn test_flat_image_codes_as_runs() {
        let layout = test_layout(64, 64, 1, 8);
        let encoded = JpegLsCodec.encode_frame(&layout, &vec![77u8; 64 * 64]).unwrap();
        // Headers plus a handful of run bits.
        assert!(encoded.len() < 80, "{} bytes", encoded.len());
    }

    #[test]
    fn test_marker_segments() {
        let layout = test_layout(3, 5, 3, 8);
        let frame: Vec<u8> = (0..45u8).collect();
        let encoded = JpegLsCodec.encode_frame(&layout, &frame).unwrap();

        assert_eq!(&encoded[..2], &[0xFF, SOI]);
        assert_eq!(
            &encoded[2..21],
            &[
                0xFF, SOF55, 0, 17, 8, 0, 3, 0, 5, 3, 1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0
            ]
        );
        let scans = encoded.windows(2).filter(|w| w == &[0xFF, SOS]).count();
        assert_eq!(scans, 3);
        let end = encoded.iter().rposition(|&b| b == EOI).unwrap();
        assert_eq!(encoded[end - 1], 0xFF);
    }

    #[test]
    fn test_twelve_bit_precision_in_header() {
        let mut layout = test_layout(2, 2, 1, 16);
        layout.bits_stored = 12;
        let frame = [0xFFu8, 0x0F, 0x00, 0x00, 0x34, 0x02, 0x00, 0x08];
        let encoded = JpegLsCodec.encode_frame(&layout, &frame).unwrap();
        assert_eq!(encoded[6], 12);
    }

    #[test]
    fn test_one_bit_data_is_rejected() {
        let mut layout = test_layout(2, 8, 1, 8);
        layout.bits_stored = 1;
        let result = JpegLsCodec.encode_frame(&layout, &[0u8; 16]);
        assert!(matches!(result, Err(CodecError::Layout(_))));
    }

    #[test]
    fn test_golomb_escape_uses_qbpp_bits() {
        let mut bits = BitWriter::default();
        // limit 32, qbpp 8: 23 zeros, a one, then value - 1 in 8 bits
        bits.golomb(200, 0, 32, 8);
        let out = bits.finish();
        assert_eq!(out, vec![0x00, 0x00, 0x01, 0xC7]);
    }

    proptest! {
        #[test]
        fn prop_scan_data_has_no_markers(
            frame in proptest::collection::vec(any::<u8>(), 16 * 16)
        ) {
            let encoded = JpegLsCodec.encode_frame(&test_layout(16, 16, 1, 8), &frame).unwrap();
            let data_start = 2 + 13 + 10;
            let data_end = encoded.len() - 2 - encoded.len() % 2;
            let scan = &encoded[data_start..data_end];
            prop_assert!(scan.windows(2).all(|w| !(w[0] == 0xFF && w[1] >= 0x80)));
        }
    }
}
