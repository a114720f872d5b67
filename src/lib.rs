//! # Infinite Bit Vectors
//!
//! *Unbounded bit sets with copy-on-write blocks and a streaming wire format.*
//!
//! ## Intuition First
//!
//! Think of a whiteboard that stretches forever to the right, painted entirely
//! white. You only ever write on a few spots, so you only need to remember
//! those spots. Now someone asks for "everything except these three cells":
//! instead of repainting an infinite board black, you flip a single sign on the
//! wall that reads *colors are swapped*. That sign is the `inverted` flag.
//!
//! ## The Problem
//!
//! Fixed-length bitsets force a choice of universe size up front, and the
//! complement of a sparse set is dense. A vector that is conceptually infinite
//! avoids both problems:
//! - **Background value**: every unstored bit equals `inverted`.
//! - **Blocks**: storage grows in fixed-size blocks, only as far as the last
//!   bit that differs from the background.
//! - **Sharing**: copying a vector shares its blocks; a block is duplicated only
//!   when one side writes to it.
//!
//! ## Mathematical Formulation
//!
//! With physical blocks $P$ and flag $f$, bit $i$ of the vector is
//! $P_i \oplus f$. Every boolean operation reduces to one word-wise primitive on
//! physical blocks plus a rule for the result flag, for example
//!
//! $$\lnot A \land \lnot B = \lnot (A \lor B), \qquad (A \oplus f) \oplus (B \oplus g) = (A \oplus B) \oplus (f \oplus g).$$
//!
//! ## Complexity Analysis
//!
//! - `get`/`set`: $O(1)$ (amortized for growth).
//! - `invert`: $O(1)$.
//! - Set operations and `count`: $O(n)$ in stored blocks; unallocated blocks are skipped.
//!
//! ## What Could Go Wrong
//!
//! 1. **Infinite counts**: `count()` on an inverted vector has no finite answer
//!    and returns [`INFINITE`]; use `count_to(length)` for a finite window.
//! 2. **Threads**: blocks are shared through `Rc`, so vectors are neither `Send`
//!    nor `Sync`.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - **[`BitVector`]**: the infinite vector, generic over its block size.
//! - **[`BitBlock`]**: lazily allocated fixed-size blocks with bitwise primitives.
//! - **[`StreamSerializer`] / [`StreamDeserializer`]**: the segment-tagged
//!   stream protocol (see [`serialize`]), readable into any block size.
//!
//! ```
//! use infbits::{BitVector, StreamDeserializer, StreamSerializer};
//!
//! let mut a = BitVector::<64>::new();
//! a.set(123, true).set(345, true);
//!
//! let mut bytes = Vec::new();
//! a.serialize(&mut StreamSerializer::new(&mut bytes)).unwrap();
//!
//! let mut b = BitVector::<128>::new();
//! b.deserialize(&mut StreamDeserializer::new(&bytes[..])).unwrap();
//! assert!(b.get(345));
//! assert_eq!(a, b);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitvec;
pub mod block;
pub mod count;
pub mod error;
pub mod refcount;
pub mod serialize;
pub mod storage;

pub use bitvec::{BitVector, INFINITE};
pub use block::{BitBlock, DEFAULT_BLOCK_BITS};
pub use error::{Error, Result};
pub use serialize::{Deserializer, Fill, Serializer, StreamDeserializer, StreamSerializer};
