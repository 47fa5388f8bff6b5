use thiserror::Error;

/// Failures reported by [`FirstFit`](crate::FirstFit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The heap source refused to grow. Recoverable: releasing memory and
  /// retrying may succeed.
  #[error("heap exhausted while growing by {requested} bytes")]
  HeapExhausted { requested: usize },
  #[error("request of {size} bytes overflows once the header is added")]
  SizeOverflow { size: usize },
  #[error("address {addr:#x} was not returned by this allocator")]
  InvalidRelease { addr: usize },
  #[error("address {addr:#x} is already free")]
  DoubleRelease { addr: usize },
}

/// A broken block-list invariant, found by
/// [`FirstFit::check_invariants`](crate::FirstFit::check_invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
  #[error("blocks exist but the list head is missing")]
  MissingHead,
  #[error("block at {addr:#x} and its neighbour do not link back to each other")]
  BrokenLink { addr: usize },
  #[error("block at {addr:#x} does not follow its predecessor in address order")]
  OutOfOrder { addr: usize },
  #[error("block at {addr:#x} ends where its successor does not start")]
  SpanMismatch { addr: usize },
  #[error("free blocks at {first:#x} and {second:#x} are adjacent and unmerged")]
  AdjacentFree { first: usize, second: usize },
  #[error("cached tail is not the last block of the list")]
  StaleTail,
  #[error("address map disagrees with the block list at {addr:#x}")]
  UnmappedBlock { addr: usize },
}
