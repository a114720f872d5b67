//! Reference-counted physical blocks.
//!
//! A [`RefCounter`] is one handle to a physical byte block. Cloning a handle
//! aliases the block and bumps the count; dropping the last handle frees it.
//! Writes go through [`RefCounter::make_mut`], which copies the bytes first
//! whenever another handle still aliases them.

use std::rc::Rc;

/// Shared handle to a fixed-length byte block with copy-on-write detach.
#[derive(Clone)]
pub struct RefCounter {
    block: Rc<Box<[u8]>>,
}

impl RefCounter {
    /// Allocate a new, unshared, all-zero block of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            block: Rc::new(vec![0u8; len].into_boxed_slice()),
        }
    }

    /// Number of handles currently aliasing this block. 1 when unshared.
    pub fn count(&self) -> usize {
        Rc::strong_count(&self.block)
    }

    /// Whether this handle is the only one pointing at its block.
    pub fn is_unique(&self) -> bool {
        self.count() == 1
    }

    /// Whether both handles alias the same physical block.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.block, &other.block)
    }

    /// Read-only view of the block.
    pub fn as_slice(&self) -> &[u8] {
        &self.block
    }

    /// Leave the current sharing group, keeping a private copy of the bytes.
    ///
    /// The other members of the group keep their block and lose one count.
    /// A no-op when the handle is already unshared.
    pub fn reset(&mut self) {
        Rc::make_mut(&mut self.block);
    }

    /// Mutable view of the block, detaching from any sharing group first.
    pub fn make_mut(&mut self) -> &mut [u8] {
        &mut **Rc::make_mut(&mut self.block)
    }
}

impl std::fmt::Debug for RefCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefCounter")
            .field("len", &self.block.len())
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refcounter_interface() {
        let mut rc1 = RefCounter::zeroed(8);
        assert_eq!(rc1.count(), 1);

        {
            let mut rc2 = rc1.clone();
            assert_eq!(rc1.count(), 2);
            assert_eq!(rc2.count(), 2);

            {
                let rc3 = rc1.clone();
                assert_eq!(rc1.count(), 3);
                assert_eq!(rc3.count(), 3);

                // Reassigning within the same group does not change the count.
                rc2 = rc3.clone();
                assert_eq!(rc2.count(), 3);
                assert_eq!(rc3.count(), 3);

                rc2.reset();
                assert_eq!(rc2.count(), 1);
                assert_eq!(rc3.count(), 2);
            }
        }

        assert_eq!(rc1.count(), 1);

        // Assigning a handle its own clone leaves the count unchanged.
        rc1 = rc1.clone();
        assert_eq!(rc1.count(), 1);

        {
            let rc4 = rc1.clone();
            assert_eq!(rc1.count(), 2);
            assert_eq!(rc4.count(), 2);
        }
    }

    #[test]
    fn test_make_mut_detaches_shared_block() {
        let mut a = RefCounter::zeroed(4);
        a.make_mut()[0] = 7;
        let mut b = a.clone();
        assert!(a.ptr_eq(&b));

        b.make_mut()[1] = 9;
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.as_slice(), &[7, 0, 0, 0]);
        assert_eq!(b.as_slice(), &[7, 9, 0, 0]);
        assert!(a.is_unique());
        assert!(b.is_unique());
    }

    #[test]
    fn test_make_mut_in_place_when_unique() {
        let mut a = RefCounter::zeroed(2);
        let before = a.as_slice().as_ptr();
        a.make_mut()[0] = 1;
        assert_eq!(a.as_slice().as_ptr(), before);
        a.reset();
        assert_eq!(a.as_slice().as_ptr(), before);
        assert_eq!(a.as_slice(), &[1, 0]);
    }
}
