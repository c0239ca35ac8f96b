//! Helpers for bit-packed storage. Bit `n` of a space lives in byte `n / 8`
//! at position `n % 8`, least significant bit first.

pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (count as usize).div_ceil(8)
}

/// Extract `width` (1..=8) bits starting at an absolute bit offset
///
/// Bits above `width` in the returned byte are zero.
pub(crate) fn get_bits(storage: &[u8], bit_offset: usize, width: u8) -> u8 {
    let (index, shift) = (bit_offset / 8, bit_offset % 8);
    let word = read_pair(storage, index) >> shift;
    (word & width_mask(width)) as u8
}

/// Replace `width` (1..=8) bits starting at an absolute bit offset with the low bits of `value`
///
/// Neighbouring bits are preserved.
pub(crate) fn set_bits(storage: &mut [u8], bit_offset: usize, width: u8, value: u8) {
    let (index, shift) = (bit_offset / 8, bit_offset % 8);
    let mask = width_mask(width) << shift;
    let word = (read_pair(storage, index) & !mask) | ((u16::from(value) << shift) & mask);

    let [low, high] = word.to_le_bytes();
    if let Some(x) = storage.get_mut(index) {
        *x = low;
    }
    if let Some(x) = storage.get_mut(index + 1) {
        *x = high;
    }
}

/// Unpack `count` bits starting at `bit_offset` into `out`, one output byte per group of eight
///
/// Returns the number of bytes produced. The caller guarantees `out` holds
/// `num_bytes_for_bits(count)` bytes.
pub(crate) fn read_packed(storage: &[u8], bit_offset: usize, count: u16, out: &mut [u8]) -> usize {
    let count = count as usize;
    let num_bytes = count.div_ceil(8);
    for (i, byte) in out.iter_mut().take(num_bytes).enumerate() {
        let width = std::cmp::min(8, count - 8 * i) as u8;
        *byte = get_bits(storage, bit_offset + 8 * i, width);
    }
    num_bytes
}

/// Pack `count` bits from `data` into storage starting at `bit_offset`
///
/// Full groups of eight are written whole. A trailing group is written only
/// when the remainder is non-zero, and only its low `remainder` bits are used.
pub(crate) fn write_packed(storage: &mut [u8], bit_offset: usize, count: u16, data: &[u8]) {
    let full = (count / 8) as usize;
    let remainder = (count % 8) as u8;

    for (i, value) in data.iter().take(full).enumerate() {
        set_bits(storage, bit_offset + 8 * i, 8, *value);
    }

    if remainder != 0 {
        if let Some(value) = data.get(full) {
            set_bits(storage, bit_offset + 8 * full, remainder, *value);
        }
    }
}

fn width_mask(width: u8) -> u16 {
    debug_assert!((1..=8).contains(&width));
    (1u16 << width) - 1
}

// bytes past the end of storage read as zero
fn read_pair(storage: &[u8], index: usize) -> u16 {
    let low = storage.get(index).copied().unwrap_or(0);
    let high = storage.get(index + 1).copied().unwrap_or(0);
    u16::from_le_bytes([low, high])
}
