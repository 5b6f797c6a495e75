//! MSB-first bit packing for header bytes.
//!
//! Fields are written highest bit first into descending output positions:
//! writing the 2-bit value `0b10` and then the 3-bit value `0b011` into a
//! fresh byte yields `0b10_011_000`.

/// Packs fields into one byte, starting at bit 7.
#[derive(Debug, Clone, Copy)]
pub struct BitWriter {
    byte: u8,
    /// Bits still free below the cursor
    free: u8,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    pub fn new() -> Self {
        Self { byte: 0, free: 8 }
    }

    /// Writes the low `width` bits of `value`, most significant first.
    pub fn write(mut self, value: u8, width: u8) -> Self {
        debug_assert!(width <= self.free, "bit field overflows byte");
        for bit in (0..width).rev() {
            self.free -= 1;
            self.byte |= ((value >> bit) & 1) << self.free;
        }
        self
    }

    pub fn write_flag(self, flag: bool) -> Self {
        self.write(u8::from(flag), 1)
    }

    /// Leaves `width` bits as zero.
    pub fn skip(mut self, width: u8) -> Self {
        debug_assert!(width <= self.free, "bit field overflows byte");
        self.free -= width;
        self
    }

    pub fn finish(self) -> u8 {
        self.byte
    }
}

/// Unpacks fields written by [`BitWriter`].
#[derive(Debug, Clone, Copy)]
pub struct BitReader {
    byte: u8,
    left: u8,
}

impl BitReader {
    pub fn new(byte: u8) -> Self {
        Self { byte, left: 8 }
    }

    /// Reads a `width`-bit field, most significant bit first.
    pub fn read(&mut self, width: u8) -> u8 {
        debug_assert!(width <= self.left, "bit field overflows byte");
        let mut value = 0;
        for _ in 0..width {
            self.left -= 1;
            value = (value << 1) | ((self.byte >> self.left) & 1);
        }
        value
    }

    pub fn read_flag(&mut self) -> bool {
        self.read(1) == 1
    }

    pub fn skip(&mut self, width: u8) {
        debug_assert!(width <= self.left, "bit field overflows byte");
        self.left -= width;
    }
}
