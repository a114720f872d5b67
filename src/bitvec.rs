//! Infinite-length bit vector over copy-on-write blocks.
//!
//! # Layout
//!
//! A [`BitVector`] is a `Vec` of [`BitBlock`]s plus one `inverted` flag. Bit `i`
//! lives in block `i / BLOCK_SIZE`; its logical value is the stored (physical)
//! bit XOR `inverted`. Indices past the last stored block read as `inverted`,
//! so the vector is conceptually infinite and only the finitely many bits that
//! differ from the background need storage.
//!
//! ```text
//!             block 0      block 1      (implicit)
//! physical    0010..01     1000..00     0000 0000 ...
//! inverted    true
//! logical     1101..10     0111..11     1111 1111 ...
//! ```
//!
//! Inverting is O(1): only the flag changes. Set operations combine the
//! physical blocks with whichever primitive matches the two polarities, so no
//! operation ever has to materialize the infinite background.

use std::ops::{BitAndAssign, BitOrAssign, BitXorAssign, Not};

use tracing::trace;

use crate::block::{BitBlock, DEFAULT_BLOCK_BITS};
use crate::count::gcd;
use crate::error::{Error, Result};
use crate::serialize::{Deserializer, Serializer};

/// Count reported for a set with infinitely many on-bits.
pub const INFINITE: usize = usize::MAX;

/// A bit vector of infinite length with set operations.
#[derive(Clone, Default)]
pub struct BitVector<const BITS: usize = DEFAULT_BLOCK_BITS> {
    blocks: Vec<BitBlock<BITS>>,
    inverted: bool,
}

impl<const BITS: usize> std::fmt::Debug for BitVector<BITS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitVector")
            .field("block_size", &Self::BLOCK_SIZE)
            .field("blocks", &self.blocks.len())
            .field("inverted", &self.inverted)
            .field("stored_ones", &self.blocks.iter().map(BitBlock::count).sum::<usize>())
            .finish()
    }
}

impl<const BITS: usize> BitVector<BITS> {
    /// Addressable bits per block.
    pub const BLOCK_SIZE: usize = BitBlock::<BITS>::ACTUAL_SIZE;

    /// Create an empty vector: every bit off.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            inverted: false,
        }
    }

    /// Number of stored blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Approximate heap memory usage in bytes.
    ///
    /// Storage shared with other vectors is split evenly among its owners.
    pub fn heap_bytes(&self) -> usize {
        self.blocks.capacity() * std::mem::size_of::<BitBlock<BITS>>()
            + self.blocks.iter().map(BitBlock::heap_bytes).sum::<usize>()
    }

    /// Set bit `index` to `value`.
    ///
    /// Setting a bit past the stored blocks to the background value is free.
    pub fn set(&mut self, index: usize, value: bool) -> &mut Self {
        let block_index = index / Self::BLOCK_SIZE;
        if block_index >= self.blocks.len() {
            if value == self.inverted {
                return self;
            }
            self.blocks.resize_with(block_index + 1, BitBlock::new);
        }
        self.blocks[block_index].set(index % Self::BLOCK_SIZE, value != self.inverted);
        self
    }

    /// Return bit `index`.
    pub fn get(&self, index: usize) -> bool {
        match self.blocks.get(index / Self::BLOCK_SIZE) {
            Some(block) => block.get(index % Self::BLOCK_SIZE) != self.inverted,
            None => self.inverted,
        }
    }

    /// Flip every bit. O(1): block payloads are not touched.
    pub fn invert(&mut self) -> &mut Self {
        self.inverted = !self.inverted;
        self
    }

    /// Whether the background (unstored) bits are on.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Reset to the empty, non-inverted vector.
    pub fn clear(&mut self) -> &mut Self {
        self.blocks.clear();
        self.inverted = false;
        self
    }

    /// Number of on-bits, or [`INFINITE`] when the vector is inverted.
    pub fn count(&self) -> usize {
        if self.inverted {
            return INFINITE;
        }
        self.blocks.iter().map(BitBlock::count).sum()
    }

    /// Number of on-bits among the first `length` bits.
    pub fn count_to(&self, length: usize) -> usize {
        let end_block = length / Self::BLOCK_SIZE;
        let full = end_block.min(self.blocks.len());
        let mut count: usize = self.blocks[..full].iter().map(BitBlock::count).sum();

        let bits_left = length % Self::BLOCK_SIZE;
        if bits_left != 0 {
            if let Some(block) = self.blocks.get(end_block) {
                count += block.count_to(bits_left);
            }
        }

        if self.inverted {
            length - count
        } else {
            count
        }
    }

    /// `self = self & other`.
    pub fn bit_and(&mut self, other: &Self) -> &mut Self {
        self.and_with(other, false);
        self
    }

    /// `self = self & !other`.
    pub fn bit_and_inv(&mut self, other: &Self) -> &mut Self {
        self.and_with(other, true);
        self
    }

    /// `self = self | other`.
    pub fn bit_or(&mut self, other: &Self) -> &mut Self {
        self.or_with(other, false);
        self
    }

    /// `self = self | !other`.
    pub fn bit_or_inv(&mut self, other: &Self) -> &mut Self {
        self.or_with(other, true);
        self
    }

    /// `self = self ^ other`.
    pub fn bit_xor(&mut self, other: &Self) -> &mut Self {
        self.xor_with(other, false);
        self
    }

    /// `self = self ^ !other`.
    pub fn bit_xor_inv(&mut self, other: &Self) -> &mut Self {
        self.xor_with(other, true);
        self
    }

    fn and_with(&mut self, other: &Self, other_inverted: bool) {
        let other_inverted = other_inverted != other.inverted;
        match (self.inverted, other_inverted) {
            (false, false) => {
                self.blocks.truncate(other.blocks.len());
                self.zip_blocks(other, BitBlock::bit_and);
            }
            (false, true) => self.zip_blocks(other, BitBlock::bit_and_inv),
            (true, false) => {
                self.blocks.resize_with(other.blocks.len(), BitBlock::new);
                self.zip_blocks(other, BitBlock::bit_inv_and);
            }
            // !a & !b == !(a | b)
            (true, true) => {
                self.grow_to(other.blocks.len());
                self.zip_blocks(other, BitBlock::bit_or);
            }
        }
        self.inverted = self.inverted && other_inverted;
    }

    fn or_with(&mut self, other: &Self, other_inverted: bool) {
        let other_inverted = other_inverted != other.inverted;
        match (self.inverted, other_inverted) {
            (false, false) => {
                self.grow_to(other.blocks.len());
                self.zip_blocks(other, BitBlock::bit_or);
            }
            // a | !b == !(!a & b)
            (false, true) => {
                self.blocks.resize_with(other.blocks.len(), BitBlock::new);
                self.zip_blocks(other, BitBlock::bit_inv_and);
            }
            // !a | b == !(a & !b)
            (true, false) => self.zip_blocks(other, BitBlock::bit_and_inv),
            // !a | !b == !(a & b)
            (true, true) => {
                self.blocks.truncate(other.blocks.len());
                self.zip_blocks(other, BitBlock::bit_and);
            }
        }
        self.inverted = self.inverted || other_inverted;
    }

    // (a ^ x) ^ (b ^ y) == (a ^ b) ^ (x ^ y): only the flag depends on polarity.
    fn xor_with(&mut self, other: &Self, other_inverted: bool) {
        let other_inverted = other_inverted != other.inverted;
        self.grow_to(other.blocks.len());
        self.zip_blocks(other, BitBlock::bit_xor);
        self.inverted = self.inverted != other_inverted;
    }

    fn grow_to(&mut self, len: usize) {
        if self.blocks.len() < len {
            self.blocks.resize_with(len, BitBlock::new);
        }
    }

    fn zip_blocks(&mut self, other: &Self, op: fn(&mut BitBlock<BITS>, &BitBlock<BITS>)) {
        for (mine, theirs) in self.blocks.iter_mut().zip(&other.blocks) {
            op(mine, theirs);
        }
    }

    /// Write the vector as one stream: START, INVERTED, one segment per block, END.
    pub fn serialize<S: Serializer + ?Sized>(&self, serializer: &mut S) -> Result<()> {
        trace!(
            blocks = self.blocks.len(),
            block_bytes = BitBlock::<BITS>::BYTE_COUNT,
            inverted = self.inverted,
            "serializing bit vector"
        );
        serializer.start()?;
        serializer.set_inverted(self.inverted)?;
        for block in &self.blocks {
            block.serialize(serializer)?;
        }
        serializer.end()
    }

    /// Replace the contents with the next stream from `deserializer`.
    ///
    /// The stream may come from a vector with a different block size. Existing
    /// blocks are reused; leftover ones are dropped. On error the contents are
    /// unspecified.
    pub fn deserialize<D: Deserializer + ?Sized>(&mut self, deserializer: &mut D) -> Result<()> {
        deserializer.start()?;
        let mut used = 0;
        while !deserializer.finished() {
            if used == self.blocks.len() {
                self.blocks.push(BitBlock::new());
            }
            if !self.blocks[used].deserialize(deserializer)? {
                break;
            }
            used += 1;
        }
        self.blocks.truncate(used);
        self.inverted = deserializer.is_inverted();

        if deserializer.failed() {
            return Err(Error::CodecFailed);
        }
        trace!(blocks = used, inverted = self.inverted, "deserialized bit vector");
        Ok(())
    }
}

impl<const A: usize, const B: usize> PartialEq<BitVector<B>> for BitVector<A> {
    fn eq(&self, other: &BitVector<B>) -> bool {
        if self.inverted != other.inverted {
            return false;
        }

        let my_bytes = BitBlock::<A>::BYTE_COUNT;
        let their_bytes = BitBlock::<B>::BYTE_COUNT;
        if my_bytes == their_bytes {
            let n = self.blocks.len().max(other.blocks.len());
            return (0..n).all(|i| match (self.blocks.get(i), other.blocks.get(i)) {
                (Some(mine), Some(theirs)) => mine == theirs,
                (Some(only), None) => only.count() == 0,
                (None, Some(only)) => only.count() == 0,
                (None, None) => true,
            });
        }

        // Walk both byte streams in chunks that never straddle a block on either side.
        let step = gcd(my_bytes, their_bytes);
        let total = (self.blocks.len() * my_bytes).max(other.blocks.len() * their_bytes);
        let my_empty = BitBlock::<A>::new();
        let their_empty = BitBlock::<B>::new();
        (0..total).step_by(step).all(|offset| {
            let mine = self.blocks.get(offset / my_bytes).unwrap_or(&my_empty);
            let theirs = other.blocks.get(offset / their_bytes).unwrap_or(&their_empty);
            mine.equal_range(offset % my_bytes, theirs, offset % their_bytes, step)
        })
    }
}

impl<const BITS: usize> Eq for BitVector<BITS> {}

impl<const BITS: usize> BitAndAssign<&BitVector<BITS>> for BitVector<BITS> {
    fn bitand_assign(&mut self, rhs: &BitVector<BITS>) {
        self.bit_and(rhs);
    }
}

impl<const BITS: usize> BitOrAssign<&BitVector<BITS>> for BitVector<BITS> {
    fn bitor_assign(&mut self, rhs: &BitVector<BITS>) {
        self.bit_or(rhs);
    }
}

impl<const BITS: usize> BitXorAssign<&BitVector<BITS>> for BitVector<BITS> {
    fn bitxor_assign(&mut self, rhs: &BitVector<BITS>) {
        self.bit_xor(rhs);
    }
}

impl<const BITS: usize> Not for BitVector<BITS> {
    type Output = Self;

    fn not(mut self) -> Self {
        self.invert();
        self
    }
}

impl<const BITS: usize> FromIterator<usize> for BitVector<BITS> {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bv = Self::new();
        for i in iter {
            bv.set(i, true);
        }
        bv
    }
}
