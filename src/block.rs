//! Fixed-capacity bit blocks with word-wise boolean operations.
//!
//! A block of `BITS` nominal bits is rounded up to whole 64-bit operands: its
//! actual capacity is [`BitBlock::ACTUAL_SIZE`] bits stored in
//! [`BitBlock::BYTE_COUNT`] bytes. Storage is lazy: an unallocated block reads as
//! all zero, and most operations against an all-zero operand are resolved
//! without touching (or allocating) memory.
//!
//! # Shortcuts
//!
//! With `0` standing for an unallocated block:
//!
//! ```text
//! and      0 & b  = 0        a & 0  = 0
//! and_inv  0 & !b = 0        a & !0 = a
//! inv_and  !0 & b = b        !a & 0 = 0
//! or       0 | b  = b        a | 0  = a
//! xor      0 ^ b  = b        a ^ 0  = a
//! ```
//!
//! Adopting `b` is a shared handle, not a copy; the copy happens on the next write.

use crate::count::count_bits;
use crate::error::Result;
use crate::serialize::{Deserializer, Fill, Serializer};
use crate::storage::BitBlockStorage;

/// Nominal block size used when none is given.
pub const DEFAULT_BLOCK_BITS: usize = 65536;

/// Upper bound on the stack buffer used while deserializing one block.
pub const STAGING_BYTES: usize = 4096;

const OPERAND_BYTES: usize = std::mem::size_of::<u64>();

/// A block of bits backed by copy-on-write storage.
#[derive(Clone, Default)]
pub struct BitBlock<const BITS: usize = DEFAULT_BLOCK_BITS> {
    storage: BitBlockStorage,
}

impl<const BITS: usize> BitBlock<BITS> {
    /// Width of the word used by the bulk operations.
    pub const OPERAND_BITS: usize = OPERAND_BYTES * 8;
    /// Number of operand words per block (at least one).
    pub const WORDS: usize = 1 + (BITS.saturating_sub(1)) / Self::OPERAND_BITS;
    /// Number of bytes of physical storage per block.
    pub const BYTE_COUNT: usize = Self::WORDS * OPERAND_BYTES;
    /// Number of addressable bits per block.
    pub const ACTUAL_SIZE: usize = Self::BYTE_COUNT * 8;

    /// Create an unallocated (all zero) block.
    pub const fn new() -> Self {
        Self {
            storage: BitBlockStorage::new(),
        }
    }

    /// Whether the block owns (possibly shared) physical storage.
    pub fn is_allocated(&self) -> bool {
        self.storage.is_allocated()
    }

    /// Whether `self` and `other` currently alias one physical block.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.storage.shares_with(&other.storage)
    }

    /// Approximate heap bytes attributable to this block.
    pub fn heap_bytes(&self) -> usize {
        self.storage.heap_bytes()
    }

    /// Set bit `index` to `value`.
    ///
    /// Clearing a bit of an unallocated block does not allocate.
    ///
    /// # Panics
    ///
    /// Panics if `index >= Self::ACTUAL_SIZE`. Release builds skip the check
    /// when clearing a bit of an unallocated block.
    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < Self::ACTUAL_SIZE, "bit index {index} out of range");
        if !value && !self.storage.is_allocated() {
            return;
        }
        let data = self.storage.data_mut(Self::BYTE_COUNT);
        let mask = 1u8 << (index % 8);
        if value {
            data[index / 8] |= mask;
        } else {
            data[index / 8] &= !mask;
        }
    }

    /// Return the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= Self::ACTUAL_SIZE`. Release builds skip the check
    /// on an unallocated block.
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < Self::ACTUAL_SIZE, "bit index {index} out of range");
        match self.storage.data() {
            Some(data) => data[index / 8] & (1u8 << (index % 8)) != 0,
            None => false,
        }
    }

    /// Number of set bits in the whole block.
    pub fn count(&self) -> usize {
        self.count_to(Self::ACTUAL_SIZE)
    }

    /// Number of set bits among the first `length` bits.
    pub fn count_to(&self, length: usize) -> usize {
        self.storage
            .data()
            .map_or(0, |data| count_bits(data, length.min(Self::ACTUAL_SIZE)))
    }

    /// `self = self & other`.
    pub fn bit_and(&mut self, other: &Self) {
        if !self.storage.is_allocated() || self.shares_storage_with(other) {
            return;
        }
        match other.storage.data() {
            Some(theirs) => apply(self.storage.data_mut(Self::BYTE_COUNT), theirs, |a, b| a & b),
            None => self.storage.release(),
        }
    }

    /// `self = self & !other`.
    pub fn bit_and_inv(&mut self, other: &Self) {
        if !self.storage.is_allocated() {
            return;
        }
        if self.shares_storage_with(other) {
            self.storage.release();
            return;
        }
        if let Some(theirs) = other.storage.data() {
            apply(self.storage.data_mut(Self::BYTE_COUNT), theirs, |a, b| a & !b);
        }
    }

    /// `self = !self & other`.
    pub fn bit_inv_and(&mut self, other: &Self) {
        let Some(theirs) = other.storage.data() else {
            self.storage.release();
            return;
        };
        if !self.storage.is_allocated() {
            self.storage.share(&other.storage);
        } else if self.shares_storage_with(other) {
            self.storage.release();
        } else {
            apply(self.storage.data_mut(Self::BYTE_COUNT), theirs, |a, b| !a & b);
        }
    }

    /// `self = self | other`.
    pub fn bit_or(&mut self, other: &Self) {
        let Some(theirs) = other.storage.data() else {
            return;
        };
        if !self.storage.is_allocated() {
            self.storage.share(&other.storage);
        } else if !self.shares_storage_with(other) {
            apply(self.storage.data_mut(Self::BYTE_COUNT), theirs, |a, b| a | b);
        }
    }

    /// `self = self ^ other`.
    pub fn bit_xor(&mut self, other: &Self) {
        let Some(theirs) = other.storage.data() else {
            return;
        };
        if !self.storage.is_allocated() {
            self.storage.share(&other.storage);
        } else if self.shares_storage_with(other) {
            self.storage.release();
        } else {
            apply(self.storage.data_mut(Self::BYTE_COUNT), theirs, |a, b| a ^ b);
        }
    }

    /// `self = self ^ !other`.
    ///
    /// Always materializes: the result is all ones where both inputs agree.
    pub fn bit_xor_inv(&mut self, other: &Self) {
        if self.shares_storage_with(other) {
            self.storage.release();
            self.storage.data_mut(Self::BYTE_COUNT).fill(0xFF);
            return;
        }
        let theirs = other.storage.data();
        let mine = self.storage.data_mut(Self::BYTE_COUNT);
        match theirs {
            Some(theirs) => apply(mine, theirs, |a, b| a ^ !b),
            None => mine.iter_mut().for_each(|b| *b = !*b),
        }
    }

    /// Compare `len` bytes of `self` starting at byte `my_offset` against `len`
    /// bytes of `other` starting at byte `other_offset`.
    ///
    /// Both ranges must lie within their blocks.
    pub fn equal_range<const B: usize>(
        &self,
        my_offset: usize,
        other: &BitBlock<B>,
        other_offset: usize,
        len: usize,
    ) -> bool {
        let mine = self.storage.data().map(|d| &d[my_offset..my_offset + len]);
        let theirs = other
            .storage
            .data()
            .map(|d| &d[other_offset..other_offset + len]);
        match (mine, theirs) {
            (Some(a), Some(b)) => a == b,
            (Some(only), None) | (None, Some(only)) => count_bits(only, len * 8) == 0,
            (None, None) => true,
        }
    }

    /// Write this block as one empty or literal segment.
    pub fn serialize<S: Serializer + ?Sized>(&self, serializer: &mut S) -> Result<()> {
        let on_bits = self.count();
        match self.storage.data() {
            Some(data) if on_bits > 0 => serializer.add_bytes(data, on_bits),
            _ => serializer.add_empty_bytes(Self::BYTE_COUNT),
        }
    }

    /// Fill this block with the next [`Self::BYTE_COUNT`] bytes of the stream.
    ///
    /// Returns whether any bytes were consumed. Bytes the stream runs out of
    /// read as zero. Storage is only allocated once a literal chunk arrives.
    pub fn deserialize<D: Deserializer + ?Sized>(&mut self, deserializer: &mut D) -> Result<bool> {
        let mut staging = [0u8; STAGING_BYTES];
        let mut offset = 0;
        let mut consumed = false;
        let mut materialized = false;

        while offset < Self::BYTE_COUNT {
            let n = (Self::BYTE_COUNT - offset).min(STAGING_BYTES);
            let chunk = &mut staging[..n];
            chunk.fill(0);
            let fill = deserializer.get_bytes(chunk)?;
            if fill == Fill::Nothing {
                break;
            }
            consumed = true;
            if fill == Fill::Literal && !materialized {
                if self.storage.ref_count() > 1 {
                    self.storage.release();
                }
                self.storage.data_mut(Self::BYTE_COUNT).fill(0);
                materialized = true;
            }
            if materialized {
                self.storage.data_mut(Self::BYTE_COUNT)[offset..offset + n].copy_from_slice(chunk);
            }
            offset += n;
        }

        if !materialized {
            self.storage.release();
        }
        Ok(consumed)
    }
}

impl<const A: usize, const B: usize> PartialEq<BitBlock<B>> for BitBlock<A> {
    fn eq(&self, other: &BitBlock<B>) -> bool {
        if Self::ACTUAL_SIZE != BitBlock::<B>::ACTUAL_SIZE {
            return false;
        }
        match (self.storage.data(), other.storage.data()) {
            (Some(a), Some(b)) => a == b,
            (Some(_), None) => self.count() == 0,
            (None, Some(_)) => other.count() == 0,
            (None, None) => true,
        }
    }
}

impl<const BITS: usize> Eq for BitBlock<BITS> {}

impl<const BITS: usize> std::fmt::Debug for BitBlock<BITS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitBlock")
            .field("size", &Self::ACTUAL_SIZE)
            .field("allocated", &self.is_allocated())
            .field("ones", &self.count())
            .finish()
    }
}

/// Word-wise `dst = op(dst, src)` over the common prefix of two buffers.
fn apply(dst: &mut [u8], src: &[u8], op: impl Fn(u64, u64) -> u64) {
    for (d, s) in dst
        .chunks_exact_mut(OPERAND_BYTES)
        .zip(src.chunks_exact(OPERAND_BYTES))
    {
        let word = op(load(d), load(s));
        d.copy_from_slice(&word.to_le_bytes());
    }
}

fn load(bytes: &[u8]) -> u64 {
    let mut word = [0u8; OPERAND_BYTES];
    word.copy_from_slice(bytes);
    u64::from_le_bytes(word)
}
