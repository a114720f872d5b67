//! Population counts over byte ranges.
//!
//! Bits are addressed LSB-first: bit 0 is the least significant bit of byte 0,
//! bit 8 the least significant bit of byte 1, and so on.

/// Number of set bits for every `u8` value.
pub const COUNT_LUT: [u8; 256] = build_lut();

const fn build_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        lut[i] = (i as u8).count_ones() as u8;
        i += 1;
    }
    lut
}

/// Count the set bits among the first `bit_len` bits of `data`.
///
/// Whole bytes are summed through [`COUNT_LUT`]; the trailing `bit_len % 8`
/// bits are masked out of the next byte if that byte exists.
pub fn count_bits(data: &[u8], bit_len: usize) -> usize {
    let whole = (bit_len / 8).min(data.len());
    let mut count: usize = data[..whole]
        .iter()
        .map(|&b| COUNT_LUT[b as usize] as usize)
        .sum();

    let rem = bit_len % 8;
    if rem != 0 {
        if let Some(&last) = data.get(whole) {
            let mask = (1u8 << rem) - 1;
            count += COUNT_LUT[(last & mask) as usize] as usize;
        }
    }
    count
}

/// Greatest common divisor.
pub fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
