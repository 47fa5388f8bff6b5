use std::collections::HashSet;

use crate::{error::Violation, first_fit::FirstFit, heap::HeapSource};

impl<H: HeapSource> FirstFit<H> {
  /// Walks the whole block list and reports the first broken invariant.
  ///
  /// Checks that links are mutual and follow ascending addresses, that every
  /// block's span ends where the next header starts (the last one at the end
  /// of the grown heap), that no two neighbours are both free, and that the
  /// address map covers exactly the listed blocks.
  pub fn check_invariants(&self) -> Result<(), Violation> {
    let Some(head) = self.head() else {
      if self.heap_bytes() > 0 || self.owned_addresses().next().is_some() {
        return Err(Violation::MissingHead);
      }
      return Ok(());
    };

    let first = self.block(head);
    if first.prev.is_some() {
      return Err(Violation::BrokenLink {
        addr: first.data().addr(),
      });
    }

    let mut listed = HashSet::new();
    let mut last = head;

    for id in self.ids() {
      let block = self.block(id);
      let addr = block.data().addr();

      if self.owner_of(addr) != Some(id) {
        return Err(Violation::UnmappedBlock { addr });
      }

      if let Some(next_id) = block.next {
        let next = self.block(next_id);

        if next.prev != Some(id) {
          return Err(Violation::BrokenLink { addr });
        }
        if next.start.addr() <= block.start.addr() {
          return Err(Violation::OutOfOrder {
            addr: next.data().addr(),
          });
        }
        if block.end() != next.start {
          return Err(Violation::SpanMismatch { addr });
        }
        if block.is_free && next.is_free {
          return Err(Violation::AdjacentFree {
            first: addr,
            second: next.data().addr(),
          });
        }
      }

      listed.insert(id);
      last = id;
    }

    if self.tail() != Some(last) {
      return Err(Violation::StaleTail);
    }

    let tail = self.block(last);
    if first.start.wrapping_add(self.heap_bytes()) != tail.end() {
      return Err(Violation::SpanMismatch {
        addr: tail.data().addr(),
      });
    }

    if let Some((addr, _)) = self
      .owned_addresses()
      .find(|(_, id)| !listed.contains(id))
    {
      return Err(Violation::UnmappedBlock { addr });
    }

    Ok(())
  }
}
