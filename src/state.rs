use std::ptr::NonNull;

use crate::{
  arena::{ArenaError, ArenaProvider},
  block::Block,
  diag::{Event, Trail},
  free_list::FreeList,
  heap::HeapStats,
};

/// Everything a heap mutates, kept behind the heap lock.
///
/// Methods here never lock; they are the building blocks the public entry
/// points in [`crate::Heap`] compose while holding the guard.
pub struct HeapState<P> {
  pub(crate) provider: P,
  pub(crate) free_list: FreeList,
  pub(crate) stats: HeapStats,
}

// SAFETY: the blocks reachable from the free list live in arenas that are never
// unmapped and are only touched through this state, which the heap lock
// serializes.
unsafe impl<P: Send> Send for HeapState<P> {}

impl<P: ArenaProvider> HeapState<P> {
  pub const fn new(provider: P) -> Self {
    Self {
      provider,
      free_list: FreeList::new(),
      stats: HeapStats::ZERO,
    }
  }

  /// Hands out a block of at least `size` bytes, reusing a freed one when the
  /// first-fit search finds it and mapping a new arena otherwise.
  pub fn malloc_internal(
    &mut self,
    size: usize,
    trail: &mut Trail,
  ) -> Result<NonNull<u8>, ArenaError> {
    if let Some(block) = self.free_list.take_first_fit(size) {
      block.set_free(false);
      block.set_next(None);

      self.stats.reused_blocks += 1;
      trail.record(Event::BlockReused {
        requested: size,
        size: block.size(),
        payload: block.payload().as_ptr() as usize,
      });

      return Ok(block.payload());
    }

    let arena = self.provider.request_arena(size)?;
    self.stats.arenas_mapped += 1;
    self.stats.bytes_mapped += arena.len;
    trail.record(Event::ArenaMapped {
      requested: size,
      mapped: arena.len,
      base: arena.base.as_ptr() as usize,
    });

    // SAFETY: `ArenaProvider` guarantees a fresh, page-aligned mapping with
    // room for a header and `size` bytes.
    let block = unsafe { Block::init(arena.base, size) };

    self.stats.fresh_blocks += 1;
    trail.record(Event::BlockCreated {
      requested: size,
      header: block.header_addr(),
      payload: block.payload().as_ptr() as usize,
    });

    Ok(block.payload())
  }

  /// Returns a block to the free list. Freeing an already free block is
  /// reported and otherwise ignored.
  ///
  /// # Safety
  ///
  /// `payload` must have been handed out by this state.
  pub unsafe fn free_internal(
    &mut self,
    payload: NonNull<u8>,
    trail: &mut Trail,
  ) {
    let block = unsafe { Block::from_payload(payload) };

    if block.is_free() {
      self.stats.double_frees += 1;
      trail.record(Event::DoubleFree {
        payload: payload.as_ptr() as usize,
      });
      return;
    }

    block.set_free(true);
    self.free_list.push(block);
    self.stats.frees += 1;
  }
}
