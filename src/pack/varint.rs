//! the pack entry size header codec.
//!
//! each pack entry starts with a size header using little-endian
//! base-128 continuation framing seeded by a 4-bit field, not a plain
//! varint. The first byte carries the continuation flag (bit 7), the
//! entry type tag (bits 4-6), and the low 4 bits of the size; each
//! following byte carries the continuation flag and 7 more size bits,
//! folded in at an increasing shift.
//!
//! the decoder is an explicit accumulator/shift state machine so it can
//! be unit-tested in isolation from stream I/O.

/// incremental decoder for one size header
#[derive(Debug, Default)]
pub struct SizeDecoder {
    value: u64,
    shift: u32,
}

impl SizeDecoder {
    /// create a decoder with an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// feed the first byte of a header
    ///
    /// seeds the accumulator with the low 4 bits and returns the entry
    /// type tag (bits 4-6) and whether a continuation byte follows.
    pub fn begin(&mut self, byte: u8) -> (u8, bool) {
        self.value = (byte & 0x0f) as u64;
        self.shift = 4;
        ((byte >> 4) & 0x07, continues(byte))
    }

    /// feed one continuation byte
    ///
    /// folds the low 7 bits into the accumulator at the current shift
    /// and returns whether another byte follows, or `None` once the
    /// header no longer fits a `u64` size. Hostile streams can set the
    /// continuation bit indefinitely; the decoder must fail, not wrap.
    pub fn push(&mut self, byte: u8) -> Option<bool> {
        let bits = (byte & 0x7f) as u64;
        if self.shift >= u64::BITS || (bits << self.shift) >> self.shift != bits {
            return None;
        }
        self.value |= bits << self.shift;
        self.shift += 7;
        Some(continues(byte))
    }

    /// the declared size accumulated so far
    pub fn value(&self) -> u64 {
        self.value
    }
}

fn continues(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// decode one entry header from the front of a buffer
///
/// returns `(type_tag, declared_size, bytes_consumed)`, or `None` if
/// the buffer ends while a continuation bit is still set or the header
/// declares a size wider than a `u64`.
pub fn decode_entry_header(buf: &[u8]) -> Option<(u8, u64, usize)> {
    let mut bytes = buf.iter();
    let mut decoder = SizeDecoder::new();
    let mut consumed = 1;

    let (tag, mut more) = decoder.begin(*bytes.next()?);
    while more {
        more = decoder.push(*bytes.next()?)?;
        consumed += 1;
    }

    Some((tag, decoder.value(), consumed))
}
