//! Walks through the malloc family on a fresh heap and prints what happens.
//!
//! Run with `RUST_LOG=mapalloc=debug cargo run --example heap_tour` to see the
//! heap's own diagnostics next to the demo output.

use std::{mem, ptr};

use mapalloc::{Heap, HeapConfig};
use tracing_subscriber::EnvFilter;

fn section(title: &str) {
  println!("\n[TEST] {title}");
}

fn tour_malloc(heap: &Heap) {
  section("malloc");

  let ptr = heap.malloc(128);
  println!("malloc(128) = {ptr:?}");
  unsafe {
    ptr::write_bytes(ptr, 0xAB, 128);
    heap.free(ptr);
  }
  println!("free on malloc'ed memory succeeded");
}

fn tour_calloc(heap: &Heap) {
  section("calloc");

  let ptr = heap.calloc(10, mem::size_of::<i32>());
  let values = unsafe { std::slice::from_raw_parts(ptr as *const i32, 10) };
  let all_zero = values.iter().all(|&v| v == 0);
  println!(
    "calloc(10, size_of::<i32>()) = {ptr:?}, zero-initialized: {}",
    if all_zero { "passed" } else { "failed" }
  );
  unsafe { heap.free(ptr) };

  let empty = heap.calloc(0, 100);
  println!("calloc(0, 100) returned null: {}", empty.is_null());

  let huge = usize::MAX / 2 + 1;
  let overflow = heap.calloc(2, huge);
  println!("calloc(2, usize::MAX / 2 + 1) returned null: {}", overflow.is_null());
}

fn tour_realloc(heap: &Heap) {
  section("realloc");

  unsafe {
    let ptr = heap.malloc(64);
    ptr::write_bytes(ptr, 0xCD, 64);

    let grown = heap.realloc(ptr, 128);
    let kept = std::slice::from_raw_parts(grown, 64).iter().all(|&b| b == 0xCD);
    println!("realloc to 128 bytes = {grown:?}, data preserved: {kept}");

    let shrunk = heap.realloc(grown, 32);
    println!("realloc to 32 bytes kept the pointer: {}", shrunk == grown);

    let gone = heap.realloc(shrunk, 0);
    println!("realloc to 0 bytes returned null: {}", gone.is_null());
  }
}

fn tour_reuse(heap: &Heap) {
  section("reuse");

  let blocks: Vec<*mut u8> = (0..10).map(|_| heap.malloc(100)).collect();
  for &block in &blocks {
    unsafe { heap.free(block) };
  }
  let mapped = heap.stats().arenas_mapped;

  let again = heap.malloc(100);
  println!(
    "malloc(100) after freeing 10 blocks reused {again:?} (last freed {:?}), new arenas: {}",
    blocks[9],
    heap.stats().arenas_mapped - mapped
  );
}

fn tour_double_free(heap: &Heap) {
  section("double free");

  let ptr = heap.malloc(48);
  unsafe {
    heap.free(ptr);
    heap.free(ptr);
  }
  let a = heap.malloc(48);
  let b = heap.malloc(48);
  println!("double free absorbed, next two blocks distinct: {}", a != b);
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_thread_names(true)
    .init();

  let config = match HeapConfig::from_env() {
    Ok(config) => config,
    Err(err) => {
      eprintln!("{err}, using defaults");
      HeapConfig::DEFAULT
    }
  };
  let heap = Heap::with_config(config);

  tour_malloc(&heap);
  tour_calloc(&heap);
  tour_realloc(&heap);
  tour_reuse(&heap);
  tour_double_free(&heap);

  println!("\n{:#?}", heap.stats());
}
