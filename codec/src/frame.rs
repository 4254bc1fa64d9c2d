use std::fmt;

use crate::error::DecodeError;

/// A fixed-width bit vector, most significant bit first.
///
/// Index 0 is the first bit on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    width: u8,
    bits: u32,
}

impl Frame {
    pub const MAX_WIDTH: u8 = 32;

    /// Build a frame of `width` bits holding `value`.
    pub fn new(width: u8, value: u32) -> Result<Self, DecodeError> {
        if width > Self::MAX_WIDTH {
            return Err(DecodeError::WidthMismatch {
                expected: Self::MAX_WIDTH,
                actual: width,
            });
        }
        if value & !mask(width) != 0 {
            return Err(DecodeError::ValueTooWide { value, width });
        }
        Ok(Self { width, bits: value })
    }

    /// A frame of `width` set bits, capped at [`Frame::MAX_WIDTH`].
    pub fn ones(width: u8) -> Self {
        let width = width.min(Self::MAX_WIDTH);
        Self {
            width,
            bits: mask(width),
        }
    }

    /// Build a frame from bits in wire order.
    pub fn from_bits(bits: &[bool]) -> Result<Self, DecodeError> {
        if bits.len() > usize::from(Self::MAX_WIDTH) {
            return Err(DecodeError::WidthMismatch {
                expected: Self::MAX_WIDTH,
                actual: u8::try_from(bits.len()).unwrap_or(u8::MAX),
            });
        }
        let width = bits.len() as u8;
        let value = bits
            .iter()
            .fold(0u32, |acc, &bit| (acc << 1) | u32::from(bit));
        Ok(Self { width, bits: value })
    }

    /// Append `bit` after the last bit on the wire.
    pub fn push(&mut self, bit: bool) -> Result<(), DecodeError> {
        if self.width >= Self::MAX_WIDTH {
            return Err(DecodeError::WidthMismatch {
                expected: Self::MAX_WIDTH,
                actual: self.width.saturating_add(1),
            });
        }
        self.bits = (self.bits << 1) | u32::from(bit);
        self.width += 1;
        Ok(())
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    /// The frame as an unsigned integer.
    pub fn value(&self) -> u32 {
        self.bits
    }

    /// Bit at wire position `index`, or `None` past the end.
    pub fn bit(&self, index: u8) -> Option<bool> {
        if index >= self.width {
            return None;
        }
        Some((self.bits >> (self.width - 1 - index)) & 1 == 1)
    }

    /// Iterate bits in wire order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.width).filter_map(move |i| self.bit(i))
    }

    pub fn is_all_zero(&self) -> bool {
        self.bits == 0
    }

    pub fn is_all_ones(&self) -> bool {
        self.width > 0 && self.bits == mask(self.width)
    }

    /// `len` bits starting at wire position `start`.
    pub fn slice(&self, start: u8, len: u8) -> Result<Self, DecodeError> {
        let end = start.saturating_add(len);
        if end > self.width {
            return Err(DecodeError::WidthMismatch {
                expected: end,
                actual: self.width,
            });
        }
        let shift = self.width - end;
        Ok(Self {
            width: len,
            bits: (self.bits >> shift) & mask(len),
        })
    }

    /// Concatenate `tail` after this frame.
    pub fn concat(&self, tail: &Frame) -> Result<Self, DecodeError> {
        let width = self.width + tail.width;
        if width > Self::MAX_WIDTH {
            return Err(DecodeError::WidthMismatch {
                expected: Self::MAX_WIDTH,
                actual: width,
            });
        }
        let head = if tail.width == 32 { 0 } else { self.bits << tail.width };
        Ok(Self {
            width,
            bits: head | tail.bits,
        })
    }
}

pub(crate) fn mask(width: u8) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}
