use std::{
  process, ptr,
  ptr::NonNull,
  sync::atomic::{AtomicU8, Ordering},
};

use parking_lot::{Mutex, const_mutex};

use crate::{
  arena::{ArenaError, ArenaProvider, MmapArena},
  config::{FATAL_EXIT_CODE, HeapConfig, OsFailurePolicy},
  diag::{self, Trail},
  state::HeapState,
};

/// Counters describing what a heap has done so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
  pub arenas_mapped: usize,
  pub bytes_mapped: usize,
  pub fresh_blocks: usize,
  pub reused_blocks: usize,
  pub frees: usize,
  pub double_frees: usize,
  pub calloc_overflows: usize,
  /// Blocks currently on the free list.
  pub free_blocks: usize,
  /// Sum of the recorded sizes of the blocks on the free list.
  pub free_bytes: usize,
}

impl HeapStats {
  pub const ZERO: Self = Self {
    arenas_mapped: 0,
    bytes_mapped: 0,
    fresh_blocks: 0,
    reused_blocks: 0,
    frees: 0,
    double_frees: 0,
    calloc_overflows: 0,
    free_blocks: 0,
    free_bytes: 0,
  };
}

const DIAGNOSTICS_BIT: u8 = 1;
const RETURN_NULL_BIT: u8 = 1 << 1;

/// A [`HeapConfig`] packed into one byte, replaceable after the heap is built.
struct SharedConfig(AtomicU8);

impl SharedConfig {
  const fn new(config: HeapConfig) -> Self {
    Self(AtomicU8::new(Self::pack(config)))
  }

  const fn pack(config: HeapConfig) -> u8 {
    let mut bits = 0;
    if config.diagnostics {
      bits |= DIAGNOSTICS_BIT;
    }
    if let OsFailurePolicy::ReturnNull = config.on_os_failure {
      bits |= RETURN_NULL_BIT;
    }
    bits
  }

  fn load(&self) -> HeapConfig {
    let bits = self.0.load(Ordering::Acquire);

    HeapConfig {
      on_os_failure: if bits & RETURN_NULL_BIT != 0 {
        OsFailurePolicy::ReturnNull
      } else {
        OsFailurePolicy::Abort
      },
      diagnostics: bits & DIAGNOSTICS_BIT != 0,
    }
  }

  fn store(
    &self,
    config: HeapConfig,
  ) {
    self.0.store(Self::pack(config), Ordering::Release);
  }
}

/// A first-fit heap over OS arenas.
///
/// Every public method takes the heap lock for its whole duration, arena
/// requests included. Diagnostics are written after the lock is released.
pub struct Heap<P = MmapArena> {
  state: Mutex<HeapState<P>>,
  config: SharedConfig,
}

impl Heap<MmapArena> {
  pub const fn new() -> Self {
    Self::with_config(HeapConfig::DEFAULT)
  }

  pub const fn with_config(config: HeapConfig) -> Self {
    Self::with_provider(MmapArena, config)
  }
}

impl Default for Heap<MmapArena> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P: ArenaProvider> Heap<P> {
  pub const fn with_provider(
    provider: P,
    config: HeapConfig,
  ) -> Self {
    Self {
      state: const_mutex(HeapState::new(provider)),
      config: SharedConfig::new(config),
    }
  }

  pub fn config(&self) -> HeapConfig {
    self.config.load()
  }

  /// Replaces the configuration. Calls already past their lock keep the
  /// settings they started with.
  pub fn set_config(
    &self,
    config: HeapConfig,
  ) {
    self.config.store(config);
  }

  /// Allocates at least `size` bytes, aligned to 16.
  ///
  /// A zero `size` still yields a unique pointer that can be freed. Null is
  /// only returned when an arena cannot be mapped and the heap is configured
  /// with [`OsFailurePolicy::ReturnNull`].
  pub fn malloc(
    &self,
    size: usize,
  ) -> *mut u8 {
    let mut trail = Trail::new();
    let result = self.state.lock().malloc_internal(size, &mut trail);

    self.finish(&trail, result.map(Some))
  }

  /// Returns a block to the heap. Null and already freed pointers are
  /// ignored.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer returned by this heap. Pointers from
  /// elsewhere, or stale pointers whose block has since been handed out
  /// again, corrupt the heap.
  pub unsafe fn free(
    &self,
    ptr: *mut u8,
  ) {
    let Some(payload) = NonNull::new(ptr) else {
      return;
    };

    let mut trail = Trail::new();
    unsafe { self.state.lock().free_internal(payload, &mut trail) };

    self.emit(&trail);
  }

  /// Allocates `count * element_size` zeroed bytes.
  ///
  /// Returns null when either argument is zero or the product overflows.
  pub fn calloc(
    &self,
    count: usize,
    element_size: usize,
  ) -> *mut u8 {
    let mut trail = Trail::new();
    let result = self
      .state
      .lock()
      .calloc_internal(count, element_size, &mut trail);

    self.finish(&trail, result)
  }

  /// Resizes a block.
  ///
  /// - null `ptr` behaves like [`Heap::malloc`];
  /// - a zero `new_size` frees `ptr` and returns null;
  /// - a smaller size keeps the pointer and only lowers the recorded size;
  /// - a larger size moves the data into a new block and frees the old one.
  ///
  /// # Safety
  ///
  /// Same contract as [`Heap::free`].
  pub unsafe fn realloc(
    &self,
    ptr: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    let mut trail = Trail::new();
    let result = unsafe {
      self
        .state
        .lock()
        .realloc_internal(NonNull::new(ptr), new_size, &mut trail)
    };

    self.finish(&trail, result)
  }

  pub fn stats(&self) -> HeapStats {
    let state = self.state.lock();

    HeapStats {
      free_blocks: state.free_list.len(),
      free_bytes: state.free_list.iter().map(|block| block.size()).sum(),
      ..state.stats
    }
  }

  fn emit(
    &self,
    trail: &Trail,
  ) {
    if self.config().diagnostics {
      diag::emit(trail);
    }
  }

  fn finish(
    &self,
    trail: &Trail,
    result: Result<Option<NonNull<u8>>, ArenaError>,
  ) -> *mut u8 {
    self.emit(trail);

    match result {
      Ok(payload) => payload.map_or(ptr::null_mut(), NonNull::as_ptr),
      Err(err) => self.arena_failure(&err),
    }
  }

  fn arena_failure(
    &self,
    err: &ArenaError,
  ) -> *mut u8 {
    diag::arena_failure(err);

    match self.config().on_os_failure {
      OsFailurePolicy::Abort => process::exit(FATAL_EXIT_CODE),
      OsFailurePolicy::ReturnNull => ptr::null_mut(),
    }
  }
}
