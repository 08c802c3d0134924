//! OS-backed arenas.
//!
//! Every fresh block gets its own anonymous mapping, sized for one header plus
//! the requested payload and rounded up to whole pages.

use std::{
  io, ptr,
  ptr::NonNull,
  sync::atomic::{AtomicUsize, Ordering},
};

use thiserror::Error;

use crate::{align::checked_align_to, block::HEADER_SIZE};

#[derive(Debug, Error)]
pub enum ArenaError {
  #[error("arena for a {requested} byte payload does not fit in the address space")]
  SizeOverflow { requested: usize },
  #[error("mmap of {len} bytes failed: {source}")]
  MapFailed {
    len: usize,
    #[source]
    source: io::Error,
  },
}

/// A mapped region handed out by an [`ArenaProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arena {
  pub base: NonNull<u8>,
  /// Mapped bytes, a multiple of the page size.
  pub len: usize,
}

/// Source of raw memory for a heap.
///
/// Implementors only map pages; sizing is done by [`ArenaProvider::request_arena`].
///
/// # Safety
///
/// [`ArenaProvider::map`] must return memory that is aligned to the page size,
/// readable and writable for `len` bytes, not shared with anything else, and
/// never unmapped. [`ArenaProvider::page_size`] must be a power of two no
/// smaller than [`crate::HEADER_ALIGN`]. Heaps write block headers into
/// that memory without further checks.
pub unsafe trait ArenaProvider {
  fn page_size(&self) -> usize;

  /// Maps `len` bytes of private, read/write memory.
  ///
  /// `len` is always a non-zero multiple of [`ArenaProvider::page_size`]. The
  /// returned region must stay mapped for the life of the process.
  fn map(
    &self,
    len: usize,
  ) -> Result<NonNull<u8>, ArenaError>;

  /// Maps an arena able to hold a header and `min_payload` bytes.
  fn request_arena(
    &self,
    min_payload: usize,
  ) -> Result<Arena, ArenaError> {
    let len = arena_len(min_payload, self.page_size())?;
    let base = self.map(len)?;

    Ok(Arena { base, len })
  }
}

/// Bytes needed for a header and `payload` bytes, in whole pages.
pub fn arena_len(
  payload: usize,
  page_size: usize,
) -> Result<usize, ArenaError> {
  HEADER_SIZE
    .checked_add(payload)
    .and_then(|total| checked_align_to(total, page_size))
    .ok_or(ArenaError::SizeOverflow { requested: payload })
}

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// The system page size, queried once.
pub fn page_size() -> usize {
  let cached = PAGE_SIZE.load(Ordering::Relaxed);
  if cached != 0 {
    return cached;
  }

  let queried = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
  let size = if queried > 0 { queried as usize } else { 4096 };

  PAGE_SIZE.store(size, Ordering::Relaxed);
  size
}

/// [`ArenaProvider`] backed by `mmap(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MmapArena;

// SAFETY: anonymous mappings are page-aligned, zeroed and private, and nothing
// in this crate unmaps them.
unsafe impl ArenaProvider for MmapArena {
  fn page_size(&self) -> usize {
    page_size()
  }

  fn map(
    &self,
    len: usize,
  ) -> Result<NonNull<u8>, ArenaError> {
    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      return Err(ArenaError::MapFailed {
        len,
        source: io::Error::last_os_error(),
      });
    }

    NonNull::new(address.cast::<u8>()).ok_or(ArenaError::MapFailed {
      len,
      source: io::Error::from(io::ErrorKind::OutOfMemory),
    })
  }
}
