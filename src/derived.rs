//! `calloc` and `realloc`, composed from the unlocked core operations.

use std::ptr::{self, NonNull};

use crate::{
  arena::{ArenaError, ArenaProvider},
  block::Block,
  diag::{Event, Trail},
  state::HeapState,
};

impl<P: ArenaProvider> HeapState<P> {
  /// Zero-filled allocation of `count * element_size` bytes.
  ///
  /// `Ok(None)` when either factor is zero or the product overflows.
  pub fn calloc_internal(
    &mut self,
    count: usize,
    element_size: usize,
    trail: &mut Trail,
  ) -> Result<Option<NonNull<u8>>, ArenaError> {
    if count == 0 || element_size == 0 {
      return Ok(None);
    }

    let total = count.wrapping_mul(element_size);
    if total / element_size != count {
      self.stats.calloc_overflows += 1;
      trail.record(Event::CallocOverflow {
        count,
        element_size,
      });
      return Ok(None);
    }

    let payload = self.malloc_internal(total, trail)?;
    // SAFETY: the block behind `payload` holds at least `total` bytes.
    unsafe { ptr::write_bytes(payload.as_ptr(), 0, total) };

    Ok(Some(payload))
  }

  /// Resizes the block behind `payload`.
  ///
  /// Growing moves the data to a new block and frees the old one; shrinking
  /// only lowers the recorded size. A new size of zero frees the block and
  /// yields `Ok(None)`. If growing fails the old block is left as it was.
  ///
  /// # Safety
  ///
  /// `payload`, when present, must have been handed out by this state and not
  /// been freed since.
  pub unsafe fn realloc_internal(
    &mut self,
    payload: Option<NonNull<u8>>,
    new_size: usize,
    trail: &mut Trail,
  ) -> Result<Option<NonNull<u8>>, ArenaError> {
    let Some(payload) = payload else {
      return self.malloc_internal(new_size, trail).map(Some);
    };

    if new_size == 0 {
      unsafe { self.free_internal(payload, trail) };
      return Ok(None);
    }

    let block = unsafe { Block::from_payload(payload) };
    let size = block.size();

    if new_size == size {
      return Ok(Some(payload));
    }

    if new_size < size {
      block.set_size(new_size);
      trail.record(Event::Shrunk {
        payload: payload.as_ptr() as usize,
        from: size,
        to: new_size,
      });
      return Ok(Some(payload));
    }

    let moved = self.malloc_internal(new_size, trail)?;
    // SAFETY: the blocks are distinct, the old one holds `size` bytes and the
    // new one at least `new_size > size`.
    unsafe {
      ptr::copy_nonoverlapping(payload.as_ptr(), moved.as_ptr(), size);
      self.free_internal(payload, trail);
    }

    Ok(Some(moved))
  }
}
