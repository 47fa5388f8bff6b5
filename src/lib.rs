//! # firstfit - A First-Fit Split-and-Merge Allocator
//!
//! This crate provides a single-threaded **first-fit** allocator that grows a
//! heap region through a heap-extension primitive (`sbrk(2)` or a bounded
//! in-process region) and keeps every block, used or free, in one list
//! ordered by address.
//!
//! ## Overview
//!
//! ```text
//!   Block List (ascending addresses):
//!
//!   head
//!    │
//!    ▼
//!   ┌────────┬──────────┐   ┌────────┬─────┐   ┌────────┬────────────────┐
//!   │ header │ used: 24 │◄─►│ header │ free│◄─►│ header │   used: 300    │
//!   └────────┴──────────┘   └────────┴─────┘   └────────┴────────────────┘
//!                                                                        ▲
//!                                                                   heap end
//! ```
//!
//! - **Acquire**: walks the list from the head and takes the first free
//!   block that is large enough. If the block could also hold another header,
//!   the surplus is split off as a new free block. When nothing fits, the heap
//!   grows by `size + HEADER_SIZE` bytes and a new block is appended.
//! - **Release**: marks the block free and merges it with every free
//!   neighbour, first backwards, then forwards. Memory is never given back to
//!   the heap source.
//!
//! ## Crate Structure
//!
//! ```text
//!   firstfit
//!   ├── block      - Block record and HEADER_SIZE (internal)
//!   ├── config     - Config, TailSearch
//!   ├── error      - AllocError, Violation
//!   ├── first_fit  - FirstFit allocator, HeapStats
//!   ├── heap       - HeapSource trait, Sbrk, FixedHeap
//!   └── invariants - check_invariants validation pass
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use firstfit::{FirstFit, FixedHeap, HEADER_SIZE};
//!
//! let mut allocator = FirstFit::new(FixedHeap::new(4096).unwrap());
//!
//! let first = allocator.acquire(100).unwrap().unwrap();
//! assert_eq!(allocator.heap().brk(), 100 + HEADER_SIZE);
//!
//! allocator.release(first.as_ptr()).unwrap();
//!
//! // The freed block is found again before the heap grows.
//! let again = allocator.acquire(100).unwrap().unwrap();
//! assert_eq!(first, again);
//! ```
//!
//! ## Splitting
//!
//! ```text
//!   acquire(40) on a free 200-byte block:
//!
//!   ┌────────┬──────────────────────────────────────────┐
//!   │ header │                free: 200                 │
//!   └────────┴──────────────────────────────────────────┘
//!                           │
//!                           ▼
//!   ┌────────┬──────────┬────────┬──────────────────────┐
//!   │ header │ used: 40 │ header │ free: 200 - 40 - H   │
//!   └────────┴──────────┴────────┴──────────────────────┘
//! ```
//!
//! A block is only split when `size + HEADER_SIZE < block.size`. Otherwise it
//! is handed out whole and the extra bytes stay inside it.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: concurrent callers must serialize every call
//!   behind one lock. [`FirstFit`] is `Send` when its heap source is, but not
//!   `Sync`.
//! - **No alignment**: returned addresses are `HEADER_SIZE` past wherever the
//!   heap source put the block.
//! - **Never shrinks**: the heap only grows; freed blocks are reused.
//! - **Sole owner of the break**: with [`Sbrk`], nothing else may move the
//!   program break while the allocator is alive.
//!
//! ## Safety
//!
//! [`FirstFit::acquire`] and [`FirstFit::release`] are safe: the allocator
//! keeps block metadata in its own arena and never reads caller memory.
//! Writing through a returned pointer is up to the caller, and is only valid
//! while the block is held and the allocator (and so its heap) is alive.

mod block;
mod config;
mod error;
mod first_fit;
mod heap;
mod invariants;

pub use block::{BlockInfo, HEADER_SIZE};
pub use config::{Config, TailSearch};
pub use error::{AllocError, Violation};
pub use first_fit::{FirstFit, HeapStats};
#[cfg(unix)]
pub use heap::Sbrk;
pub use heap::{FixedHeap, HeapSource};
