use std::{collections::HashMap, fmt, iter, ptr::NonNull};

use log::{debug, trace, warn};

use crate::{
  block::{Block, BlockId, BlockInfo, HEADER_SIZE},
  config::{Config, TailSearch},
  error::AllocError,
  heap::HeapSource,
};

/// Totals over the whole block list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
  pub blocks: usize,
  pub free_blocks: usize,
  /// Usable bytes in free blocks.
  pub free_bytes: usize,
  /// Usable bytes in blocks handed out.
  pub used_bytes: usize,
  /// Bytes the heap source has grown by, headers included.
  pub heap_bytes: usize,
}

/// First-fit allocator over an address-ordered list of every block.
///
/// Acquisition takes the first free block that fits, splitting off the
/// surplus when it can hold another header. Release merges the block with
/// every free neighbour on both sides. The heap only ever grows.
pub struct FirstFit<H: HeapSource> {
  heap: H,
  config: Config,
  blocks: Vec<Block>,
  /// Arena slots of absorbed blocks, reused before the arena grows.
  vacant: Vec<BlockId>,
  head: Option<BlockId>,
  tail: Option<BlockId>,
  /// Usable address → owning block.
  owners: HashMap<usize, BlockId>,
  heap_bytes: usize,
}

// SAFETY: the block pointers only refer to memory owned by `heap`, which
// moves together with the allocator.
unsafe impl<H: HeapSource + Send> Send for FirstFit<H> {}

impl<H: HeapSource> FirstFit<H> {
  pub fn new(heap: H) -> Self {
    Self::with_config(heap, Config::default())
  }

  pub fn with_config(
    heap: H,
    config: Config,
  ) -> Self {
    Self {
      heap,
      config,
      blocks: Vec::new(),
      vacant: Vec::new(),
      head: None,
      tail: None,
      owners: HashMap::new(),
      heap_bytes: 0,
    }
  }

  pub fn heap(&self) -> &H {
    &self.heap
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Hands out a region of at least `size` bytes.
  ///
  /// Returns `Ok(None)` for a zero-sized request, without touching the block
  /// list. No alignment is applied beyond what the heap source provides.
  pub fn acquire(
    &mut self,
    size: usize,
  ) -> Result<Option<NonNull<u8>>, AllocError> {
    if size == 0 {
      trace!("acquire(0): nothing to hand out");
      return Ok(None);
    }

    let total = size
      .checked_add(HEADER_SIZE)
      .ok_or(AllocError::SizeOverflow { size })?;

    let address = match self.find_free(size, total) {
      Some(address) => address,
      None => self.grow(size, total)?,
    };

    trace!("acquire({size}) -> {address:?}");

    Ok(NonNull::new(address))
  }

  /// Gives back a region returned by [`acquire`](Self::acquire).
  ///
  /// A null `ptr` is ignored. The block is marked free and merged with its
  /// free neighbours, so no two adjacent blocks stay free.
  pub fn release(
    &mut self,
    ptr: *mut u8,
  ) -> Result<(), AllocError> {
    if ptr.is_null() {
      return Ok(());
    }

    let addr = ptr.addr();

    let Some(&id) = self.owners.get(&addr) else {
      warn!("release of unknown address {addr:#x}");
      if self.config.check_release {
        return Err(AllocError::InvalidRelease { addr });
      }
      return Ok(());
    };

    if self.blocks[id.0].is_free {
      warn!("release of already free address {addr:#x}");
      if self.config.check_release {
        return Err(AllocError::DoubleRelease { addr });
      }
    }

    trace!("release({ptr:?}), {} bytes", self.blocks[id.0].size);
    self.blocks[id.0].is_free = true;

    let id = self.merge_backward(id);
    self.merge_forward(id);

    Ok(())
  }

  /// Blocks in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.ids().map(|id| self.blocks[id.0].info())
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      heap_bytes: self.heap_bytes,
      ..HeapStats::default()
    };

    for block in self.blocks() {
      stats.blocks += 1;
      if block.is_free {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
      } else {
        stats.used_bytes += block.size;
      }
    }

    stats
  }

  pub(crate) fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
    iter::successors(self.head, |id| self.blocks[id.0].next)
  }

  pub(crate) fn block(
    &self,
    id: BlockId,
  ) -> &Block {
    &self.blocks[id.0]
  }

  pub(crate) fn head(&self) -> Option<BlockId> {
    self.head
  }

  pub(crate) fn tail(&self) -> Option<BlockId> {
    self.tail
  }

  pub(crate) fn owner_of(
    &self,
    addr: usize,
  ) -> Option<BlockId> {
    self.owners.get(&addr).copied()
  }

  pub(crate) fn owned_addresses(&self) -> impl Iterator<Item = (usize, BlockId)> + '_ {
    self.owners.iter().map(|(&addr, &id)| (addr, id))
  }

  pub(crate) fn heap_bytes(&self) -> usize {
    self.heap_bytes
  }

  /// First free block that fits, split when the surplus can hold a header.
  fn find_free(
    &mut self,
    size: usize,
    total: usize,
  ) -> Option<*mut u8> {
    let mut current = self.head;

    while let Some(id) = current {
      let block = &self.blocks[id.0];

      if block.is_free {
        if total < block.size {
          return Some(self.split(id, size));
        }

        if size <= block.size {
          debug!("reusing {}-byte block for {size} bytes", block.size);
          let block = &mut self.blocks[id.0];
          block.is_free = false;
          return Some(block.data());
        }
      }

      current = block.next;
    }

    None
  }

  /// Shrinks `id` to `size` bytes and marks it used; the rest becomes a new
  /// free block right after it.
  fn split(
    &mut self,
    id: BlockId,
    size: usize,
  ) -> *mut u8 {
    let (start, old_size, old_next) = {
      let block = &self.blocks[id.0];
      (block.start, block.size, block.next)
    };

    let mut remainder = Block::new(
      start.wrapping_add(HEADER_SIZE + size),
      old_size - size - HEADER_SIZE,
      true,
    );
    remainder.prev = Some(id);
    remainder.next = old_next;

    debug!(
      "splitting {old_size}-byte block: {size} used, {} left free",
      remainder.size
    );

    let remainder = self.insert(remainder);

    match old_next {
      Some(next) => self.blocks[next.0].prev = Some(remainder),
      None => self.tail = Some(remainder),
    }

    let block = &mut self.blocks[id.0];
    block.size = size;
    block.is_free = false;
    block.next = Some(remainder);

    block.data()
  }

  /// Extends the heap by `total` bytes and appends a used block of `size`.
  fn grow(
    &mut self,
    size: usize,
    total: usize,
  ) -> Result<*mut u8, AllocError> {
    let Some(start) = self.heap.extend(total) else {
      debug!("heap refused to grow by {total} bytes");
      return Err(AllocError::HeapExhausted { requested: total });
    };
    let start = start.as_ptr();

    let tail = self.find_tail();

    if let Some(tail) = tail {
      let end = self.blocks[tail.0].end();
      if end != start {
        warn!("heap grew at {start:?}, expected {end:?}; break moved by someone else");
      }
    }

    let mut block = Block::new(start, size, false);
    block.prev = tail;
    let id = self.insert(block);

    match tail {
      Some(tail) => self.blocks[tail.0].next = Some(id),
      None => self.head = Some(id),
    }
    self.tail = Some(id);
    self.heap_bytes += total;

    debug!("grew heap by {total} bytes at {start:?}");

    Ok(self.blocks[id.0].data())
  }

  fn find_tail(&self) -> Option<BlockId> {
    match self.config.tail_search {
      TailSearch::Walk => self.ids().last(),
      TailSearch::Cached => self.tail,
    }
  }

  fn merge_backward(
    &mut self,
    mut current: BlockId,
  ) -> BlockId {
    while let Some(prev) = self.blocks[current.0]
      .prev
      .filter(|prev| self.blocks[prev.0].is_free)
    {
      self.absorb(prev, current);
      current = prev;
    }

    current
  }

  fn merge_forward(
    &mut self,
    current: BlockId,
  ) {
    while let Some(next) = self.blocks[current.0]
      .next
      .filter(|next| self.blocks[next.0].is_free)
    {
      self.absorb(current, next);
    }
  }

  /// Folds `victim`, the successor of `into`, into `into`'s span.
  fn absorb(
    &mut self,
    into: BlockId,
    victim: BlockId,
  ) {
    let (victim_size, victim_next) = {
      let victim = &self.blocks[victim.0];
      (victim.size, victim.next)
    };

    let block = &mut self.blocks[into.0];
    block.size += HEADER_SIZE + victim_size;
    block.next = victim_next;

    debug!("merged {victim_size}-byte block, now {} bytes", block.size);

    match victim_next {
      Some(next) => self.blocks[next.0].prev = Some(into),
      None => self.tail = Some(into),
    }

    self.retire(victim);
  }

  fn insert(
    &mut self,
    block: Block,
  ) -> BlockId {
    let addr = block.data().addr();

    let id = match self.vacant.pop() {
      Some(id) => {
        self.blocks[id.0] = block;
        id
      }
      None => {
        self.blocks.push(block);
        BlockId(self.blocks.len() - 1)
      }
    };

    self.owners.insert(addr, id);
    id
  }

  fn retire(
    &mut self,
    id: BlockId,
  ) {
    self.owners.remove(&self.blocks[id.0].data().addr());
    self.vacant.push(id);
  }
}

impl<H: HeapSource> fmt::Debug for FirstFit<H> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("FirstFit")
      .field("config", &self.config)
      .field("stats", &self.stats())
      .finish_non_exhaustive()
  }
}

impl<H: HeapSource> fmt::Display for FirstFit<H> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let stats = self.stats();
    writeln!(
      f,
      "{} blocks, {} bytes grown, {} used, {} free",
      stats.blocks, stats.heap_bytes, stats.used_bytes, stats.free_bytes
    )?;

    for block in self.blocks() {
      let state = if block.is_free { "free" } else { "used" };
      writeln!(f, "  {:?}  {state}  {} bytes", block.addr, block.size)?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::FixedHeap;

  fn allocator(capacity: usize) -> FirstFit<FixedHeap> {
    FirstFit::new(FixedHeap::new(capacity).unwrap())
  }

  fn layout(allocator: &FirstFit<FixedHeap>) -> Vec<(usize, bool)> {
    allocator
      .blocks()
      .map(|block| (block.size, block.is_free))
      .collect()
  }

  #[test]
  fn test_zero_size_leaves_list_untouched() {
    let mut allocator = allocator(256);

    assert_eq!(allocator.acquire(0), Ok(None));
    assert_eq!(allocator.blocks().count(), 0);
    assert_eq!(allocator.heap().brk(), 0);
  }

  #[test]
  fn test_size_overflow() {
    let mut allocator = allocator(256);

    assert_eq!(
      allocator.acquire(usize::MAX),
      Err(AllocError::SizeOverflow { size: usize::MAX })
    );
    assert_eq!(allocator.heap().brk(), 0);
  }

  #[test]
  fn test_split_keeps_links_mutual() {
    let mut allocator = allocator(1024);

    let big = allocator.acquire(200).unwrap().unwrap();
    let guard = allocator.acquire(8).unwrap().unwrap();
    allocator.release(big.as_ptr()).unwrap();

    let small = allocator.acquire(40).unwrap().unwrap();

    assert_eq!(small, big);
    assert_eq!(
      layout(&allocator),
      vec![(40, false), (200 - 40 - HEADER_SIZE, true), (8, false)]
    );

    let remainder = allocator.block(allocator.head().unwrap()).next.unwrap();
    let last = allocator.block(remainder).next.unwrap();
    assert_eq!(allocator.block(last).prev, Some(remainder));
    assert_eq!(allocator.owner_of(guard.as_ptr().addr()), Some(last));
    assert_eq!(allocator.check_invariants(), Ok(()));
  }

  #[test]
  fn test_split_of_tail_moves_tail() {
    let mut allocator = allocator(1024);

    let block = allocator.acquire(200).unwrap().unwrap();
    allocator.release(block.as_ptr()).unwrap();
    allocator.acquire(16).unwrap();

    let last = allocator.ids().last();
    assert_eq!(allocator.tail(), last);
    assert_ne!(allocator.tail(), allocator.head());
  }

  #[test]
  fn test_merge_recycles_arena_slots() {
    let mut allocator = allocator(1024);

    let a = allocator.acquire(32).unwrap().unwrap();
    let b = allocator.acquire(32).unwrap().unwrap();
    let slots = allocator.blocks.len();

    allocator.release(a.as_ptr()).unwrap();
    allocator.release(b.as_ptr()).unwrap();
    assert_eq!(allocator.vacant.len(), 1);

    // The split remainder reuses the slot freed by the merge.
    allocator.acquire(8).unwrap();
    assert_eq!(allocator.blocks.len(), slots);
    assert!(allocator.vacant.is_empty());
    assert_eq!(allocator.check_invariants(), Ok(()));
  }

  #[test]
  fn test_absorbed_address_is_no_longer_owned() {
    let mut allocator = allocator(1024);

    let a = allocator.acquire(32).unwrap().unwrap();
    let b = allocator.acquire(32).unwrap().unwrap();
    allocator.release(a.as_ptr()).unwrap();
    allocator.release(b.as_ptr()).unwrap();

    assert_eq!(
      allocator.release(b.as_ptr()),
      Err(AllocError::InvalidRelease {
        addr: b.as_ptr().addr()
      })
    );
  }

  #[test]
  fn test_unchecked_release_ignores_bad_addresses() {
    let heap = FixedHeap::new(1024).unwrap();
    let mut allocator = FirstFit::with_config(heap, Config::default().with_check_release(false));

    let a = allocator.acquire(32).unwrap().unwrap();
    let _b = allocator.acquire(32).unwrap().unwrap();

    assert_eq!(allocator.release(a.as_ptr().wrapping_add(1)), Ok(()));
    assert_eq!(allocator.release(a.as_ptr()), Ok(()));
    assert_eq!(allocator.release(a.as_ptr()), Ok(()));

    assert_eq!(layout(&allocator), vec![(32, true), (32, false)]);
    assert_eq!(allocator.check_invariants(), Ok(()));
  }

  #[test]
  fn test_cached_tail_matches_walk() {
    let mut walk = allocator(4096);
    let heap = FixedHeap::new(4096).unwrap();
    let mut cached = FirstFit::with_config(heap, Config::default().with_tail_search(TailSearch::Cached));

    for allocator in [&mut walk, &mut cached] {
      let a = allocator.acquire(100).unwrap().unwrap();
      let b = allocator.acquire(50).unwrap().unwrap();
      allocator.release(b.as_ptr()).unwrap();
      allocator.acquire(10).unwrap();
      allocator.release(a.as_ptr()).unwrap();
      allocator.acquire(300).unwrap();
      allocator.check_invariants().unwrap();
    }

    assert_eq!(layout(&walk), layout(&cached));
    assert_eq!(walk.heap().brk(), cached.heap().brk());
  }

  #[test]
  fn test_stats_and_display() {
    let mut allocator = allocator(1024);

    let a = allocator.acquire(10).unwrap().unwrap();
    allocator.acquire(20).unwrap();
    allocator.release(a.as_ptr()).unwrap();

    assert_eq!(
      allocator.stats(),
      HeapStats {
        blocks: 2,
        free_blocks: 1,
        free_bytes: 10,
        used_bytes: 20,
        heap_bytes: 30 + 2 * HEADER_SIZE,
      }
    );

    let rendered = allocator.to_string();
    assert!(rendered.starts_with("2 blocks"));
    assert_eq!(rendered.lines().count(), 3);
    assert!(rendered.lines().nth(1).unwrap().contains("free  10 bytes"));
  }
}
