//! Size-randomized properties.

use std::ptr;

use mapalloc::{Heap, HeapConfig};
use proptest::prelude::*;

fn quiet_heap() -> Heap {
  Heap::with_config(HeapConfig::DEFAULT.diagnostics(false))
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn calloc_region_reads_zero(count in 1usize..64, element_size in 1usize..256) {
    let heap = quiet_heap();

    // Dirty a block first so calloc has something to reuse.
    let dirty = heap.malloc(count * element_size);
    unsafe {
      ptr::write_bytes(dirty, 0xEE, count * element_size);
      heap.free(dirty);
    }

    let p = heap.calloc(count, element_size);
    prop_assert_eq!(p, dirty);
    let bytes = unsafe { std::slice::from_raw_parts(p, count * element_size) };
    prop_assert!(bytes.iter().all(|&b| b == 0));
  }

  #[test]
  fn calloc_overflow_always_null(count in 2usize..1024, extra in 0usize..1_000_000) {
    let heap = quiet_heap();
    let element_size = usize::MAX / count + 1 + extra;

    prop_assert!(heap.calloc(count, element_size).is_null());
    prop_assert_eq!(heap.stats().arenas_mapped, 0);
  }

  #[test]
  fn realloc_keeps_common_prefix(old in 1usize..2048, new in 1usize..4096, seed in any::<u8>()) {
    let heap = quiet_heap();

    unsafe {
      let p = heap.malloc(old);
      for i in 0..old {
        p.add(i).write(seed.wrapping_add(i as u8));
      }

      let q = heap.realloc(p, new);
      prop_assert!(!q.is_null());
      if new <= old {
        prop_assert_eq!(q, p);
      }
      for i in 0..old.min(new) {
        prop_assert_eq!(q.add(i).read(), seed.wrapping_add(i as u8));
      }
      heap.free(q);
    }
  }

  #[test]
  fn freed_sizes_are_reused_first_fit(sizes in prop::collection::vec(1usize..512, 1..16)) {
    let heap = quiet_heap();
    let ptrs: Vec<*mut u8> = sizes.iter().map(|&size| heap.malloc(size)).collect();
    for &p in &ptrs {
      unsafe { heap.free(p) };
    }
    let mapped = heap.stats().arenas_mapped;

    // The free list holds the blocks in reverse order of freeing, and the
    // first one big enough wins.
    let request = sizes[0];
    let expected = sizes
      .iter()
      .zip(&ptrs)
      .rev()
      .find(|(size, _)| **size >= request)
      .map(|(_, &p)| p);

    prop_assert_eq!(Some(heap.malloc(request)), expected);
    prop_assert_eq!(heap.stats().arenas_mapped, mapped);
  }
}
