//! Heap-extension primitives the allocator grows into.
//!
//! ```text
//!   extend(n):
//!
//!   ┌──────────────────────────┬ ─ ─ ─ ─ ─ ─ ─ ┐
//!   │     already handed out   │   n new bytes  │
//!   └──────────────────────────┴ ─ ─ ─ ─ ─ ─ ─ ┘
//!                              ▲                ▲
//!                     returned address     new break
//! ```

use std::{
  alloc::{self, Layout},
  ptr::NonNull,
};

/// A region that can only grow at its end.
pub trait HeapSource {
  /// Grows the region by `increment` bytes.
  ///
  /// Returns the end of the region as it was before growing, or `None` when
  /// the region cannot grow any further.
  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>>;
}

/// The process data segment, grown with `sbrk(2)`.
///
/// Nothing else may move the program break while an allocator owns this
/// source, otherwise consecutive grows stop being contiguous.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

#[cfg(unix)]
impl Sbrk {
  /// Current program break, `sbrk(0)`.
  pub fn current_break() -> *mut u8 {
    unsafe { libc::sbrk(0) as *mut u8 }
  }
}

#[cfg(unix)]
impl HeapSource for Sbrk {
  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    let increment = libc::intptr_t::try_from(increment).ok()?;

    let address = unsafe { libc::sbrk(increment) };

    if address == usize::MAX as *mut libc::c_void {
      return None;
    }

    NonNull::new(address as *mut u8)
  }
}

/// A bounded heap carved out of a single up-front reservation.
///
/// Grows deterministically from [`base`](Self::base) and refuses to go past
/// `capacity` bytes.
#[derive(Debug)]
pub struct FixedHeap {
  base: NonNull<u8>,
  layout: Layout,
  capacity: usize,
  brk: usize,
}

// SAFETY: the reservation is owned exclusively by this value.
unsafe impl Send for FixedHeap {}

impl FixedHeap {
  const ALIGN: usize = 16;

  /// Reserves `capacity` bytes. Returns `None` if the system allocator
  /// cannot provide them.
  pub fn new(capacity: usize) -> Option<Self> {
    let layout = Layout::from_size_align(capacity.max(1), Self::ALIGN).ok()?;
    let base = NonNull::new(unsafe { alloc::alloc(layout) })?;

    Some(Self {
      base,
      layout,
      capacity,
      brk: 0,
    })
  }

  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  /// Bytes handed out so far.
  pub fn brk(&self) -> usize {
    self.brk
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

impl HeapSource for FixedHeap {
  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    let new_brk = self.brk.checked_add(increment)?;

    if new_brk > self.capacity() {
      return None;
    }

    // In bounds: `brk <= capacity` of the same reservation.
    let previous = unsafe { self.base.add(self.brk) };
    self.brk = new_brk;

    Some(previous)
  }
}

impl Drop for FixedHeap {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
  }
}
