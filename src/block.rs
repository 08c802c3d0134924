use std::{mem, ptr::NonNull};

use crate::align_to;

/// Alignment of every header, and therefore of every payload.
pub const HEADER_ALIGN: usize = mem::align_of::<BlockHeader>();

/// Distance between a header and the payload it describes.
pub const HEADER_SIZE: usize = align_to!(mem::size_of::<BlockHeader>(), HEADER_ALIGN);

/// Metadata written at the start of every arena.
#[repr(C, align(16))]
pub struct BlockHeader {
  /// Usable bytes currently handed out through this header.
  pub size: usize,
  pub is_free: bool,
  /// Free list link, only meaningful while `is_free` is set.
  pub next: Option<Block>,
}

/// Handle to a header living inside an arena.
///
/// This is the only place that turns payload pointers into headers and back.
/// A `Block` can only be made from memory that holds a header, and arenas are
/// never unmapped, so once built the handle stays valid for the rest of the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block(NonNull<BlockHeader>);

impl Block {
  /// Writes a fresh, in-use header at `base`.
  ///
  /// # Safety
  ///
  /// `base` must be the start of a mapping large enough for a header followed
  /// by `size` bytes, aligned to [`HEADER_ALIGN`], and owned by no other block.
  pub unsafe fn init(
    base: NonNull<u8>,
    size: usize,
  ) -> Self {
    let header = base.cast::<BlockHeader>();
    unsafe {
      header.write(BlockHeader {
        size,
        is_free: false,
        next: None,
      });
    }
    Self(header)
  }

  /// Recovers the header of a payload pointer.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by [`Block::payload`] of a block that
  /// belongs to the same heap.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
    Self(unsafe { payload.sub(HEADER_SIZE) }.cast())
  }

  pub fn payload(self) -> NonNull<u8> {
    // SAFETY: every arena holds at least a header, so the payload address is
    // inside (or one past the end of) the same mapping.
    unsafe { self.0.cast::<u8>().add(HEADER_SIZE) }
  }

  pub fn header_addr(self) -> usize {
    self.0.as_ptr() as usize
  }

  pub fn size(self) -> usize {
    unsafe { (*self.0.as_ptr()).size }
  }

  pub fn set_size(
    self,
    size: usize,
  ) {
    unsafe { (*self.0.as_ptr()).size = size }
  }

  pub fn is_free(self) -> bool {
    unsafe { (*self.0.as_ptr()).is_free }
  }

  pub fn set_free(
    self,
    is_free: bool,
  ) {
    unsafe { (*self.0.as_ptr()).is_free = is_free }
  }

  pub fn next(self) -> Option<Block> {
    unsafe { (*self.0.as_ptr()).next }
  }

  pub fn set_next(
    self,
    next: Option<Block>,
  ) {
    unsafe { (*self.0.as_ptr()).next = next }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[repr(C, align(16))]
  struct Slot([u8; 256]);

  #[test]
  fn test_header_layout() {
    assert_eq!(HEADER_ALIGN, 16);
    assert_eq!(HEADER_SIZE % HEADER_ALIGN, 0);
    assert!(HEADER_SIZE >= mem::size_of::<BlockHeader>());
  }

  #[test]
  fn test_payload_round_trip() {
    let mut slot = Slot([0; 256]);
    let base = NonNull::new(slot.0.as_mut_ptr()).unwrap();

    unsafe {
      let block = Block::init(base, 64);

      assert_eq!(block.header_addr(), base.as_ptr() as usize);
      assert_eq!(block.payload().as_ptr() as usize - block.header_addr(), HEADER_SIZE);
      assert_eq!(block.payload().as_ptr() as usize % HEADER_ALIGN, 0);
      assert_eq!(Block::from_payload(block.payload()), block);

      assert_eq!(block.size(), 64);
      assert!(!block.is_free());
      assert_eq!(block.next(), None);

      block.set_size(32);
      block.set_free(true);
      block.set_next(Some(block));

      assert_eq!(block.size(), 32);
      assert!(block.is_free());
      assert_eq!(block.next(), Some(block));
    }
  }
}
