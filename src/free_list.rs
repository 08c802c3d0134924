use crate::block::Block;

/// LIFO list of freed blocks, linked through their headers.
///
/// A block is on the list exactly when its `is_free` flag is set.
pub struct FreeList {
  head: Option<Block>,
  len: usize,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: None, len: 0 }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// Links `block` in front of the current head.
  pub fn push(
    &mut self,
    block: Block,
  ) {
    debug_assert!(block.is_free());

    block.set_next(self.head);
    self.head = Some(block);
    self.len += 1;
  }

  /// Unlinks and returns the first block that can hold `size` bytes.
  ///
  /// The returned block is still flagged free and keeps its old link, the
  /// caller decides what it becomes.
  pub fn take_first_fit(
    &mut self,
    size: usize,
  ) -> Option<Block> {
    let mut prev: Option<Block> = None;
    let mut current = self.head;

    while let Some(block) = current {
      if block.is_free() && block.size() >= size {
        match prev {
          Some(prev) => prev.set_next(block.next()),
          None => self.head = block.next(),
        }
        self.len -= 1;

        return Some(block);
      }

      prev = Some(block);
      current = block.next();
    }

    None
  }

  pub fn iter(&self) -> Iter {
    Iter { current: self.head }
  }
}

pub struct Iter {
  current: Option<Block>,
}

impl Iterator for Iter {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    let block = self.current?;
    self.current = block.next();
    Some(block)
  }
}
