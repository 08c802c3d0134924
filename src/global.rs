//! The process-wide heap.
//!
//! A single [`Heap`] over `mmap` arenas, built at compile time. It starts with
//! an empty free list and an unlocked guard and needs no teardown; the OS
//! reclaims every arena at exit.
//!
//! The first call through this module reads `MAPALLOC_ON_OS_FAILURE` and
//! `MAPALLOC_DIAGNOSTICS` with [`HeapConfig::from_env_raw`]. Calls racing with
//! that first read run with [`HeapConfig::DEFAULT`].
//!
//! ```rust,ignore
//! use mapalloc::MapAlloc;
//!
//! #[global_allocator]
//! static GLOBAL: MapAlloc = MapAlloc;
//! ```

use std::{
  alloc::{GlobalAlloc, Layout, System},
  sync::atomic::{AtomicU8, Ordering},
};

use crate::{
  block::HEADER_ALIGN,
  config::HeapConfig,
  heap::{Heap, HeapStats},
};

const ENV_UNREAD: u8 = 0;
const ENV_READING: u8 = 1;
const ENV_READ: u8 = 2;

static HEAP: Heap = Heap::new();
static ENV_STATE: AtomicU8 = AtomicU8::new(ENV_UNREAD);

/// The process-wide heap behind the free functions and [`MapAlloc`].
#[inline]
pub fn heap() -> &'static Heap {
  if ENV_STATE.load(Ordering::Acquire) != ENV_READ {
    read_env_config();
  }
  &HEAP
}

#[cold]
#[inline(never)]
fn read_env_config() {
  if ENV_STATE
    .compare_exchange(ENV_UNREAD, ENV_READING, Ordering::AcqRel, Ordering::Acquire)
    .is_err()
  {
    return;
  }

  // Runs inside MapAlloc; nothing here may allocate.
  HEAP.set_config(unsafe { HeapConfig::from_env_raw() });
  ENV_STATE.store(ENV_READ, Ordering::Release);
}

pub fn malloc(size: usize) -> *mut u8 {
  heap().malloc(size)
}

/// # Safety
///
/// `ptr` must be null or come from this module's allocation functions.
pub unsafe fn free(ptr: *mut u8) {
  unsafe { heap().free(ptr) }
}

pub fn calloc(
  count: usize,
  element_size: usize,
) -> *mut u8 {
  heap().calloc(count, element_size)
}

/// # Safety
///
/// `ptr` must be null or come from this module's allocation functions.
pub unsafe fn realloc(
  ptr: *mut u8,
  new_size: usize,
) -> *mut u8 {
  unsafe { heap().realloc(ptr, new_size) }
}

pub fn stats() -> HeapStats {
  heap().stats()
}

/// [`GlobalAlloc`] over the process-wide heap.
///
/// Heap payloads are aligned to 16 bytes. Layouts asking for more are passed
/// to [`System`]; every call gets the original layout back, so the choice is
/// made again the same way on `dealloc` and `realloc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapAlloc;

unsafe impl GlobalAlloc for MapAlloc {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > HEADER_ALIGN {
      return unsafe { System.alloc(layout) };
    }
    heap().malloc(layout.size())
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > HEADER_ALIGN {
      return unsafe { System.alloc_zeroed(layout) };
    }
    heap().calloc(1, layout.size())
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
  ) {
    if layout.align() > HEADER_ALIGN {
      return unsafe { System.dealloc(ptr, layout) };
    }
    unsafe { heap().free(ptr) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > HEADER_ALIGN {
      return unsafe { System.realloc(ptr, layout, new_size) };
    }
    unsafe { heap().realloc(ptr, new_size) }
  }
}

#[cfg(test)]
mod tests {
  use std::ptr;

  use super::*;

  #[test]
  fn test_global_round_trip() {
    let ptr = malloc(40);
    assert!(!ptr.is_null());

    unsafe {
      ptr::write_bytes(ptr, 7, 40);
      let grown = realloc(ptr, 400);
      assert!(std::slice::from_raw_parts(grown, 40).iter().all(|&b| b == 7));
      free(grown);
    }

    assert!(calloc(0, 8).is_null());
    assert!(stats().frees >= 2);
    assert!(ptr::eq(heap(), &HEAP));
  }

  #[test]
  fn test_map_alloc_alignment_split() {
    unsafe {
      let layout = Layout::from_size_align(64, 64).unwrap();
      let ptr = MapAlloc.alloc_zeroed(layout);
      assert!(!ptr.is_null());
      assert_eq!(ptr as usize % 64, 0);
      assert!(std::slice::from_raw_parts(ptr, 64).iter().all(|&b| b == 0));
      MapAlloc.dealloc(ptr, layout);

      let layout = Layout::from_size_align(64, 16).unwrap();
      let ptr = MapAlloc.alloc_zeroed(layout);
      assert!(!ptr.is_null());
      assert_eq!(ptr as usize % 16, 0);
      assert!(std::slice::from_raw_parts(ptr, 64).iter().all(|&b| b == 0));
      MapAlloc.dealloc(ptr, layout);
    }
  }
}
