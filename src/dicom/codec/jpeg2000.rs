//! JPEG 2000 Part 1 lossless codestream.
//!
//! One tile, reversible 5-3 filter with no decomposition levels, one
//! quality layer and 64x64 code-blocks. Without wavelet levels the only
//! subband is LL, so the coefficients are the DC-shifted samples and every
//! component becomes a single packet.

use super::bits::BitWriter;
use super::mq::{Context, MqEncoder};
use super::{CodecError, FrameLayout, PixelCodec};
use crate::models::CompressionScheme;

const SOC: [u8; 2] = [0xFF, 0x4F];
const SIZ: [u8; 2] = [0xFF, 0x51];
const COD: [u8; 2] = [0xFF, 0x52];
const QCD: [u8; 2] = [0xFF, 0x5C];
const SOT: [u8; 2] = [0xFF, 0x90];
const SOD: [u8; 2] = [0xFF, 0x93];
const EOC: [u8; 2] = [0xFF, 0xD9];

const CODE_BLOCK: usize = 64;
/// Code-block width and height exponents, less 2
const CODE_BLOCK_EXPONENT: u8 = 4;
const GUARD_BITS: u32 = 2;
/// Default precinct size; larger images would need several precincts.
const MAX_EXTENT: u16 = 1 << 15;

// Context labels (Tables D.1 to D.4)
const RUN_CONTEXT: usize = 17;
const UNIFORM_CONTEXT: usize = 18;
const CONTEXTS: usize = 19;

const SIGNIFICANT: u8 = 1;
const VISITED: u8 = 2;
const REFINED: u8 = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct Jpeg2000Codec;

impl PixelCodec for Jpeg2000Codec {
    fn scheme(&self) -> CompressionScheme {
        CompressionScheme::Jpeg2000
    }

    fn encode_frame(&self, layout: &FrameLayout, frame: &[u8]) -> Result<Vec<u8>, CodecError> {
        layout.check_frame(frame)?;
        layout.check_samples(1)?;
        if layout.rows > MAX_EXTENT || layout.columns > MAX_EXTENT {
            return Err(CodecError::Layout(format!(
                "{}x{} exceeds one precinct",
                layout.columns, layout.rows
            )));
        }

        let precision = u32::from(layout.bits_stored);
        let magnitude_bits = precision + GUARD_BITS - 1;
        let width = usize::from(layout.columns);
        let height = usize::from(layout.rows);

        let mut tile = Vec::new();
        for component in 0..usize::from(layout.samples_per_pixel) {
            let coefficients: Vec<i32> = layout
                .component(frame, component)
                .into_iter()
                .map(|stored| {
                    if layout.is_signed() {
                        layout.signed_value(stored)
                    } else {
                        i32::from(stored) - (1 << (precision - 1))
                    }
                })
                .collect();
            tile.extend_from_slice(&encode_packet(&coefficients, width, height, magnitude_bits));
        }

        let mut out = Vec::with_capacity(tile.len() + 128);
        out.extend_from_slice(&SOC);
        write_siz(&mut out, layout);
        write_cod(&mut out);
        write_qcd(&mut out, precision);

        // Tile-part length runs from SOT through the end of the tile data.
        let tile_part_len = 12 + SOD.len() + tile.len();
        out.extend_from_slice(&SOT);
        out.extend_from_slice(&10u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(tile_part_len as u32).to_be_bytes());
        out.extend_from_slice(&[0, 1]);
        out.extend_from_slice(&SOD);
        out.extend_from_slice(&tile);
        out.extend_from_slice(&EOC);
        if out.len() % 2 == 1 {
            out.push(0);
        }
        Ok(out)
    }
}

fn write_siz(out: &mut Vec<u8>, layout: &FrameLayout) {
    let components = layout.samples_per_pixel;
    let width = u32::from(layout.columns);
    let height = u32::from(layout.rows);
    out.extend_from_slice(&SIZ);
    out.extend_from_slice(&(38 + 3 * components).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    // Image and tile size, both anchored at the origin.
    for value in [width, height, 0, 0, width, height, 0, 0] {
        out.extend_from_slice(&value.to_be_bytes());
    }
    out.extend_from_slice(&components.to_be_bytes());
    let depth = (u8::from(layout.is_signed()) << 7) | (layout.bits_stored as u8 - 1);
    for _ in 0..components {
        out.extend_from_slice(&[depth, 1, 1]);
    }
}

fn write_cod(out: &mut Vec<u8>) {
    out.extend_from_slice(&COD);
    out.extend_from_slice(&12u16.to_be_bytes());
    // Scod, LRCP, one layer, no component transform
    out.extend_from_slice(&[0, 0, 0, 1, 0]);
    // No decomposition levels, code-block size, default style, 5-3 filter
    out.extend_from_slice(&[0, CODE_BLOCK_EXPONENT, CODE_BLOCK_EXPONENT, 0, 1]);
}

fn write_qcd(out: &mut Vec<u8>, precision: u32) {
    out.extend_from_slice(&QCD);
    out.extend_from_slice(&4u16.to_be_bytes());
    out.push((GUARD_BITS as u8) << 5);
    out.push((precision as u8) << 3);
}

/// Tier-1 output of one code-block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CodeBlock {
    data: Vec<u8>,
    passes: u32,
    /// Magnitude bit-planes actually coded
    planes: u32,
}

/// The single packet holding every code-block of one component.
fn encode_packet(coefficients: &[i32], width: usize, height: usize, magnitude_bits: u32) -> Vec<u8> {
    let blocks_wide = width.div_ceil(CODE_BLOCK);
    let blocks_high = height.div_ceil(CODE_BLOCK);

    let mut blocks = Vec::with_capacity(blocks_wide * blocks_high);
    for by in 0..blocks_high {
        for bx in 0..blocks_wide {
            let (x0, y0) = (bx * CODE_BLOCK, by * CODE_BLOCK);
            let w = CODE_BLOCK.min(width - x0);
            let h = CODE_BLOCK.min(height - y0);
            let block: Vec<i32> = (y0..y0 + h)
                .flat_map(|y| coefficients[y * width + x0..y * width + x0 + w].iter().copied())
                .collect();
            blocks.push(encode_code_block(&block, w, h));
        }
    }

    let mut header = BitWriter::default();
    if blocks.iter().all(|block| block.passes == 0) {
        header.put(0, 1);
        return header.finish();
    }
    header.put(1, 1);

    let mut inclusion = TagTree::new(
        blocks_wide,
        blocks_high,
        blocks.iter().map(|b| u32::from(b.passes == 0)).collect(),
    );
    let mut zero_planes = TagTree::new(
        blocks_wide,
        blocks_high,
        blocks.iter().map(|b| magnitude_bits - b.planes).collect(),
    );

    for (index, block) in blocks.iter().enumerate() {
        inclusion.encode(&mut header, index, 1);
        if block.passes == 0 {
            continue;
        }
        zero_planes.encode(&mut header, index, u32::MAX);
        put_pass_count(&mut header, block.passes);
        put_length(&mut header, block.data.len() as u32, block.passes);
    }

    let mut packet = header.finish();
    for block in &blocks {
        packet.extend_from_slice(&block.data);
    }
    packet
}

/// Codewords for the number of new coding passes (Table B.4).
fn put_pass_count(bits: &mut BitWriter, passes: u32) {
    match passes {
        1 => bits.put(0, 1),
        2 => bits.put(0b10, 2),
        3..=5 => {
            bits.put(0b11, 2);
            bits.put(passes - 3, 2);
        }
        6..=36 => {
            bits.put(0b1111, 4);
            bits.put(passes - 6, 5);
        }
        _ => {
            bits.put(0x1FF, 9);
            bits.put(passes - 37, 7);
        }
    }
}

/// Codeword segment length, preceded by the Lblock increase it needs.
fn put_length(bits: &mut BitWriter, len: u32, passes: u32) {
    const INITIAL_LBLOCK: u32 = 3;
    let pass_bits = passes.ilog2();
    let needed = u32::BITS - len.leading_zeros();
    let increase = needed.saturating_sub(INITIAL_LBLOCK + pass_bits);
    for _ in 0..increase {
        bits.put(1, 1);
    }
    bits.put(0, 1);
    bits.put(len, INITIAL_LBLOCK + increase + pass_bits);
}

/// Quad-tree of minimum values coded incrementally (B.10.2).
#[derive(Debug)]
struct TagTree {
    /// Width of each level, leaves first
    widths: Vec<usize>,
    /// Index of each level's first node
    offsets: Vec<usize>,
    value: Vec<u32>,
    low: Vec<u32>,
    known: Vec<bool>,
}

impl TagTree {
    fn new(width: usize, height: usize, leaves: Vec<u32>) -> Self {
        let (mut w, mut h) = (width, height);
        let mut widths = vec![w];
        let mut heights = vec![h];
        while w > 1 || h > 1 {
            w = w.div_ceil(2);
            h = h.div_ceil(2);
            widths.push(w);
            heights.push(h);
        }

        let mut offsets = Vec::with_capacity(widths.len());
        let mut total = 0;
        for (w, h) in widths.iter().zip(&heights) {
            offsets.push(total);
            total += w * h;
        }

        let mut value = vec![u32::MAX; total];
        value[..leaves.len()].copy_from_slice(&leaves);
        for level in 1..widths.len() {
            for y in 0..heights[level - 1] {
                for x in 0..widths[level - 1] {
                    let child = value[offsets[level - 1] + y * widths[level - 1] + x];
                    let parent = &mut value[offsets[level] + (y / 2) * widths[level] + x / 2];
                    *parent = (*parent).min(child);
                }
            }
        }

        Self {
            widths,
            offsets,
            value,
            low: vec![0; total],
            known: vec![false; total],
        }
    }

    fn encode(&mut self, bits: &mut BitWriter, leaf: usize, threshold: u32) {
        let (x, y) = (leaf % self.widths[0], leaf / self.widths[0]);
        let mut low = 0;
        for level in (0..self.widths.len()).rev() {
            let node = self.offsets[level] + (y >> level) * self.widths[level] + (x >> level);
            if low > self.low[node] {
                self.low[node] = low;
            } else {
                low = self.low[node];
            }
            while low < threshold {
                if low >= self.value[node] {
                    if !self.known[node] {
                        bits.put(1, 1);
                        self.known[node] = true;
                    }
                    break;
                }
                bits.put(0, 1);
                low += 1;
            }
            self.low[node] = low;
        }
    }
}

fn encode_code_block(coefficients: &[i32], width: usize, height: usize) -> CodeBlock {
    let largest = coefficients.iter().map(|c| c.unsigned_abs()).max().unwrap_or(0);
    let planes = u32::BITS - largest.leading_zeros();
    if planes == 0 {
        return CodeBlock {
            data: Vec::new(),
            passes: 0,
            planes: 0,
        };
    }

    let mut coder = BlockCoder::new(MqEncoder::new(), width, height);
    coder.load(coefficients);
    let passes = coder.code_planes(planes);
    CodeBlock {
        data: coder.coder.finish(),
        passes,
        planes,
    }
}

/// One binary decision through the arithmetic coder.
trait BitCoder {
    fn code(&mut self, bit: u8, cx: &mut Context) -> u8;
}

impl BitCoder for MqEncoder {
    fn code(&mut self, bit: u8, cx: &mut Context) -> u8 {
        self.encode(bit, cx);
        bit
    }
}

/// Coding passes over one code-block (Annex D).
///
/// State arrays carry a one-sample border so neighbour lookups never leave
/// the block; border cells are never significant.
struct BlockCoder<C> {
    coder: C,
    width: usize,
    height: usize,
    stride: usize,
    magnitude: Vec<u32>,
    negative: Vec<u8>,
    flags: Vec<u8>,
    contexts: [Context; CONTEXTS],
}

impl<C: BitCoder> BlockCoder<C> {
    fn new(coder: C, width: usize, height: usize) -> Self {
        let stride = width + 2;
        let cells = stride * (height + 2);
        let mut contexts = [Context::default(); CONTEXTS];
        contexts[0] = Context::with_state(4);
        contexts[RUN_CONTEXT] = Context::with_state(3);
        contexts[UNIFORM_CONTEXT] = Context::with_state(46);
        Self {
            coder,
            width,
            height,
            stride,
            magnitude: vec![0; cells],
            negative: vec![0; cells],
            flags: vec![0; cells],
            contexts,
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        (y + 1) * self.stride + x + 1
    }

    fn load(&mut self, coefficients: &[i32]) {
        for (n, &value) in coefficients.iter().enumerate() {
            let i = self.index(n % self.width, n / self.width);
            self.magnitude[i] = value.unsigned_abs();
            self.negative[i] = u8::from(value < 0);
        }
    }

    /// Stripe-oriented scan: four rows at a time, column by column.
    fn scan(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.width * self.height);
        for stripe in (0..self.height).step_by(4) {
            for x in 0..self.width {
                for y in stripe..(stripe + 4).min(self.height) {
                    order.push(self.index(x, y));
                }
            }
        }
        order
    }

    /// Code bit-planes from the most significant down; returns the pass count.
    fn code_planes(&mut self, planes: u32) -> u32 {
        let order = self.scan();
        let mut passes = 0;
        for plane in (0..planes).rev() {
            if plane + 1 < planes {
                self.significance_pass(&order, plane);
                self.refinement_pass(&order, plane);
                passes += 2;
            }
            self.cleanup_pass(plane);
            passes += 1;
        }
        passes
    }

    fn is_significant(&self, i: usize) -> bool {
        self.flags[i] & SIGNIFICANT != 0
    }

    fn neighbourhood(&self, i: usize) -> (u32, u32, u32) {
        let s = self.stride;
        let sig = |j: usize| u32::from(self.is_significant(j));
        let horizontal = sig(i - 1) + sig(i + 1);
        let vertical = sig(i - s) + sig(i + s);
        let diagonal = sig(i - s - 1) + sig(i - s + 1) + sig(i + s - 1) + sig(i + s + 1);
        (horizontal, vertical, diagonal)
    }

    /// Zero coding context for the LL band.
    fn significance_context(&self, i: usize) -> usize {
        match self.neighbourhood(i) {
            (2, _, _) => 8,
            (1, 1.., _) => 7,
            (1, 0, 1..) => 6,
            (1, 0, 0) => 5,
            (0, 2, _) => 4,
            (0, 1, _) => 3,
            (0, 0, 2..) => 2,
            (0, 0, 1) => 1,
            _ => 0,
        }
    }

    fn sign_context(&self, i: usize) -> (usize, u8) {
        let s = self.stride;
        let contribution = |j: usize| -> i32 {
            match (self.is_significant(j), self.negative[j]) {
                (false, _) => 0,
                (true, 0) => 1,
                (true, _) => -1,
            }
        };
        let horizontal = (contribution(i - 1) + contribution(i + 1)).clamp(-1, 1);
        let vertical = (contribution(i - s) + contribution(i + s)).clamp(-1, 1);
        match (horizontal, vertical) {
            (1, 1) => (13, 0),
            (1, 0) => (12, 0),
            (1, _) => (11, 0),
            (0, 1) => (10, 0),
            (0, 0) => (9, 0),
            (0, _) => (10, 1),
            (_, 1) => (11, 1),
            (_, 0) => (12, 1),
            _ => (13, 1),
        }
    }

    fn code_bit(&mut self, i: usize, plane: u32, cx: usize) -> u8 {
        let bit = ((self.magnitude[i] >> plane) & 1) as u8;
        let bit = self.coder.code(bit, &mut self.contexts[cx]);
        self.magnitude[i] |= u32::from(bit) << plane;
        bit
    }

    fn code_sign(&mut self, i: usize) {
        let (cx, flip) = self.sign_context(i);
        let bit = self.coder.code(self.negative[i] ^ flip, &mut self.contexts[cx]);
        self.negative[i] = bit ^ flip;
        self.flags[i] |= SIGNIFICANT;
    }

    fn significance_pass(&mut self, order: &[usize], plane: u32) {
        for &i in order {
            if self.is_significant(i) {
                continue;
            }
            let cx = self.significance_context(i);
            if cx == 0 {
                continue;
            }
            self.flags[i] |= VISITED;
            if self.code_bit(i, plane, cx) == 1 {
                self.code_sign(i);
            }
        }
    }

    fn refinement_pass(&mut self, order: &[usize], plane: u32) {
        for &i in order {
            if self.flags[i] & (SIGNIFICANT | VISITED) != SIGNIFICANT {
                continue;
            }
            let cx = if self.flags[i] & REFINED != 0 {
                16
            } else if self.neighbourhood(i) == (0, 0, 0) {
                14
            } else {
                15
            };
            self.code_bit(i, plane, cx);
            self.flags[i] |= REFINED;
        }
    }

    fn cleanup_pass(&mut self, plane: u32) {
        for stripe in (0..self.height).step_by(4) {
            let rows = (self.height - stripe).min(4);
            for x in 0..self.width {
                let column: Vec<usize> = (0..rows).map(|r| self.index(x, stripe + r)).collect();
                let mut start = 0;

                let run_mode = rows == 4
                    && column.iter().all(|&i| {
                        self.flags[i] & (SIGNIFICANT | VISITED) == 0
                            && self.neighbourhood(i) == (0, 0, 0)
                    });
                if run_mode {
                    let first = column
                        .iter()
                        .position(|&i| (self.magnitude[i] >> plane) & 1 == 1);
                    let any = self
                        .coder
                        .code(u8::from(first.is_some()), &mut self.contexts[RUN_CONTEXT]);
                    if any == 0 {
                        continue;
                    }
                    let position = first.unwrap_or(0) as u8;
                    let high = self
                        .coder
                        .code((position >> 1) & 1, &mut self.contexts[UNIFORM_CONTEXT]);
                    let low = self
                        .coder
                        .code(position & 1, &mut self.contexts[UNIFORM_CONTEXT]);
                    let row = usize::from((high << 1) | low);
                    let i = column[row];
                    self.magnitude[i] |= 1 << plane;
                    self.code_sign(i);
                    start = row + 1;
                }

                for &i in &column[start..] {
                    if self.flags[i] & (SIGNIFICANT | VISITED) != 0 {
                        continue;
                    }
                    let cx = self.significance_context(i);
                    if self.code_bit(i, plane, cx) == 1 {
                        self.code_sign(i);
                    }
                }
            }
        }
        for flag in &mut self.flags {
            *flag &= !VISITED;
        }
    }
}
