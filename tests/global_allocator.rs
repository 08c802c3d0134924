use std::alloc::{GlobalAlloc, Layout, alloc, dealloc};

use mapalloc::MapAlloc;

#[global_allocator]
static GLOBAL: MapAlloc = MapAlloc;

// Kept to a single test so harness threads do not contend on the heap lock.
#[test]
fn std_collections_run_on_the_global_heap() {
  // Box allocation
  let b = Box::new(42u64);
  assert_eq!(*b, 42);
  drop(b);

  // Vec allocation, grown through realloc
  let mut v: Vec<u32> = Vec::new();
  for i in 0..1000 {
    v.push(i);
  }
  assert_eq!(v.len(), 1000);
  assert_eq!(v[999], 999);
  v.truncate(10);
  v.shrink_to_fit();
  assert_eq!(v, (0..10).collect::<Vec<_>>());
  drop(v);

  // String allocation
  let s = String::from("hello, mapalloc global allocator!");
  assert_eq!(s, "hello, mapalloc global allocator!");
  drop(s);

  // Zeroed allocation
  let zeros = vec![0u8; 10_000];
  assert!(zeros.iter().all(|&b| b == 0));

  let stats = mapalloc::global::stats();
  assert!(stats.arenas_mapped > 0);
  assert!(stats.frees > 0);

  // Up to 16 byte alignment is served by the heap, anything stronger goes to
  // the system allocator.
  unsafe {
    let layout = Layout::from_size_align(256, 16).unwrap();
    let before = mapalloc::global::stats().frees;
    let p = alloc(layout);
    assert!(!p.is_null());
    assert_eq!(p as usize % 16, 0);
    dealloc(p, layout);
    assert!(mapalloc::global::stats().frees > before);

    let layout = Layout::from_size_align(256, 128).unwrap();
    let p = GLOBAL.alloc(layout);
    assert!(!p.is_null());
    assert_eq!(p as usize % 128, 0);
    let p = GLOBAL.realloc(p, layout, 4096);
    assert_eq!(p as usize % 128, 0);
    GLOBAL.dealloc(p, Layout::from_size_align(4096, 128).unwrap());
  }
}
