//! C allocator symbols over the process-wide heap.
//!
//! Built with the `c-abi` feature, the `cdylib` exports `malloc`, `free`,
//! `calloc` and `realloc` and can be preloaded in front of the platform
//! allocator.

use std::ffi::c_void;

use crate::global;

#[unsafe(no_mangle)]
pub extern "C" fn malloc(size: usize) -> *mut c_void {
  global::malloc(size).cast()
}

/// # Safety
///
/// `ptr` must be null or come from this library's allocation functions.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
  unsafe { global::free(ptr.cast()) }
}

#[unsafe(no_mangle)]
pub extern "C" fn calloc(
  nmemb: usize,
  size: usize,
) -> *mut c_void {
  global::calloc(nmemb, size).cast()
}

/// # Safety
///
/// `ptr` must be null or come from this library's allocation functions.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(
  ptr: *mut c_void,
  size: usize,
) -> *mut c_void {
  unsafe { global::realloc(ptr.cast(), size).cast() }
}
