//! Lazily allocated, copy-on-write block storage.

use crate::refcount::RefCounter;

/// Zero or one physical block, shared by reference counting.
///
/// No block means the logical content is all zero. Nothing is allocated until
/// the first call to [`BitBlockStorage::data_mut`].
#[derive(Clone, Debug, Default)]
pub struct BitBlockStorage {
    block: Option<RefCounter>,
}

impl BitBlockStorage {
    /// Create empty storage.
    pub const fn new() -> Self {
        Self { block: None }
    }

    /// Whether a physical block is owned (possibly shared).
    pub fn is_allocated(&self) -> bool {
        self.block.is_some()
    }

    /// Read-only bytes, or `None` when unallocated.
    pub fn data(&self) -> Option<&[u8]> {
        self.block.as_ref().map(RefCounter::as_slice)
    }

    /// Mutable bytes, allocating `len` zero bytes when unallocated and
    /// detaching from other owners when shared.
    pub fn data_mut(&mut self, len: usize) -> &mut [u8] {
        self.block
            .get_or_insert_with(|| RefCounter::zeroed(len))
            .make_mut()
    }

    /// Number of storages aliasing the same physical block (1 when unshared
    /// or unallocated).
    pub fn ref_count(&self) -> usize {
        self.block.as_ref().map_or(1, RefCounter::count)
    }

    /// Whether two storages alias one physical block.
    pub fn shares_with(&self, other: &Self) -> bool {
        match (&self.block, &other.block) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Alias another storage's block without copying it.
    pub fn share(&mut self, other: &Self) {
        self.block.clone_from(&other.block);
    }

    /// Drop the block, returning to the all-zero state.
    pub fn release(&mut self) {
        self.block = None;
    }

    /// Approximate heap bytes attributable to this storage.
    pub fn heap_bytes(&self) -> usize {
        match &self.block {
            Some(b) => b.as_slice().len() / b.count(),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_allocation() {
        let mut s = BitBlockStorage::new();
        assert!(!s.is_allocated());
        assert!(s.data().is_none());
        assert_eq!(s.ref_count(), 1);

        s.data_mut(16)[3] = 0xFF;
        assert!(s.is_allocated());
        assert_eq!(s.data().map(|d| d.len()), Some(16));
        assert_eq!(s.data().map(|d| d[3]), Some(0xFF));
    }

    #[test]
    fn test_copy_on_write() {
        let mut a = BitBlockStorage::new();
        a.data_mut(8)[0] = 1;

        let mut b = a.clone();
        assert!(a.shares_with(&b));
        assert_eq!(a.ref_count(), 2);

        b.data_mut(8)[0] = 2;
        assert!(!a.shares_with(&b));
        assert_eq!(a.data().map(|d| d[0]), Some(1));
        assert_eq!(b.data().map(|d| d[0]), Some(2));
        assert_eq!(a.ref_count(), 1);
    }

    #[test]
    fn test_share_and_release() {
        let mut a = BitBlockStorage::new();
        a.data_mut(8)[7] = 0x80;
        let mut b = BitBlockStorage::new();
        b.share(&a);
        assert!(b.shares_with(&a));
        b.release();
        assert!(!b.is_allocated());
        assert_eq!(a.ref_count(), 1);
    }
}
