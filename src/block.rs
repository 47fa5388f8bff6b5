use std::mem;

/// Bytes reserved in front of every block's usable memory.
///
/// The heap keeps room for one machine word each of `size`, the free flag,
/// `next` and `prev`, so grow requests and returned addresses land exactly where
/// an in-band header would put them.
pub const HEADER_SIZE: usize = 4 * mem::size_of::<usize>();

/// Handle of a block record inside the allocator's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BlockId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) struct Block {
  /// Address of the block's header in the heap.
  pub start: *mut u8,
  pub size: usize,
  pub is_free: bool,
  pub next: Option<BlockId>,
  pub prev: Option<BlockId>,
}

impl Block {
  pub fn new(
    start: *mut u8,
    size: usize,
    is_free: bool,
  ) -> Self {
    Self {
      start,
      size,
      is_free,
      next: None,
      prev: None,
    }
  }

  /// Address handed to the caller: the byte right after the header.
  pub fn data(&self) -> *mut u8 {
    self.start.wrapping_add(HEADER_SIZE)
  }

  /// One past the last usable byte.
  pub fn end(&self) -> *mut u8 {
    self.data().wrapping_add(self.size)
  }

  pub fn info(&self) -> BlockInfo {
    BlockInfo {
      addr: self.data(),
      size: self.size,
      is_free: self.is_free,
    }
  }
}

/// Read-only view of one block, as reported by
/// [`FirstFit::blocks`](crate::FirstFit::blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Start of the usable memory (header excluded).
  pub addr: *mut u8,
  /// Usable bytes.
  pub size: usize,
  pub is_free: bool,
}
