//! Bit output shared by the JPEG-LS scan and JPEG 2000 packet headers.
//!
//! Both formats forbid a byte 0xFF followed by a byte with its high bit
//! set, so a zero bit is stuffed after every 0xFF.

/// MSB-first bit output with a zero bit stuffed after every 0xFF byte.
#[derive(Debug)]
pub struct BitWriter {
    out: Vec<u8>,
    current: u32,
    filled: u32,
    capacity: u32,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self {
            out: Vec::new(),
            current: 0,
            filled: 0,
            capacity: 8,
        }
    }
}

impl BitWriter {
    pub fn put(&mut self, value: u32, count: u32) {
        for shift in (0..count).rev() {
            self.current = (self.current << 1) | (value >> shift & 1);
            self.filled += 1;
            if self.filled == self.capacity {
                self.emit();
            }
        }
    }

    pub fn zeros(&mut self, count: u32) {
        for _ in 0..count {
            self.put(0, 1);
        }
    }

    fn emit(&mut self) {
        let byte = self.current as u8;
        self.out.push(byte);
        self.capacity = if byte == 0xFF { 7 } else { 8 };
        self.current = 0;
        self.filled = 0;
    }

    /// Limited-length Golomb code of `value` with parameter `k`.
    pub fn golomb(&mut self, value: u32, k: u32, limit: u32, qbpp: u32) {
        let high = value >> k;
        if high < limit - qbpp - 1 {
            self.zeros(high);
            self.put(1, 1);
            self.put(value & ((1 << k) - 1), k);
        } else {
            self.zeros(limit - qbpp - 1);
            self.put(1, 1);
            self.put((value - 1) & ((1 << qbpp) - 1), qbpp);
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.current <<= self.capacity - self.filled;
            self.emit();
        }
        if self.out.last() == Some(&0xFF) {
            self.out.push(0);
        }
        self.out
    }
}
