//! # mapalloc - malloc, free, calloc and realloc over raw OS mappings
//!
//! This crate provides a small general purpose heap that takes its memory
//! straight from `mmap(2)`, one anonymous mapping per fresh block, and recycles
//! freed blocks through a first-fit free list.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         Heap (one lock)                              │
//!   │                                                                      │
//!   │   free list head                                                     │
//!   │        │                                                             │
//!   │        ▼                                                             │
//!   │   ┌─────────┐      ┌─────────┐      ┌─────────┐                      │
//!   │   │ arena C │ ───► │ arena A │ ───► │ arena F │ ───► None            │
//!   │   │ free    │      │ free    │      │ free    │                      │
//!   │   └─────────┘      └─────────┘      └─────────┘                      │
//!   │                                                                      │
//!   │   ┌─────────┐      ┌─────────┐      ┌─────────┐                      │
//!   │   │ arena B │      │ arena D │      │ arena E │    (in use)          │
//!   │   └─────────┘      └─────────┘      └─────────┘                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Freed blocks are pushed on the front of the list (LIFO).
//!   Allocation takes the first block that is big enough (first-fit).
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   mapalloc
//!   ├── align      - Alignment helpers (align_to!, checked_align_to)
//!   ├── arena      - ArenaProvider trait and the mmap-backed MmapArena
//!   ├── block      - Block header and the payload <-> header handle (internal)
//!   ├── free_list  - Intrusive LIFO free list (internal)
//!   ├── state      - Unlocked malloc/free core (internal)
//!   ├── derived    - Unlocked calloc/realloc (internal)
//!   ├── heap       - Heap, the locked public entry points
//!   ├── config     - HeapConfig and OsFailurePolicy
//!   ├── diag       - tracing diagnostics emitted after unlocking (internal)
//!   ├── global     - Process-wide heap and MapAlloc (GlobalAlloc)
//!   └── ffi        - extern "C" malloc family (feature `c-abi`)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mapalloc::Heap;
//!
//! let heap = Heap::new();
//!
//! let ptr = heap.calloc(10, 4);
//! assert!(!ptr.is_null());
//!
//! unsafe {
//!     let ptr = heap.realloc(ptr, 80);
//!     heap.free(ptr);
//! }
//!
//! assert_eq!(heap.stats().free_blocks, 2);
//! ```
//!
//! ## How It Works
//!
//! Each allocation is backed by a block with a header in front of the payload:
//!
//! ```text
//!   Single Arena (whole pages):
//!   ┌───────────────────────┬────────────────────────────────┬─────────┐
//!   │    Block Header       │         User Data              │ slack   │
//!   │  ┌─────────────────┐  │                                │         │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │         │
//!   │  │ is_free: false  │  │  │                          │  │         │
//!   │  │ next: None      │  │  │     N bytes usable       │  │         │
//!   │  └─────────────────┘  │  │                          │  │         │
//!   │   HEADER_SIZE bytes   │  └──────────────────────────┘  │         │
//!   └───────────────────────┴────────────────────────────────┴─────────┘
//!   ▲                       ▲
//!   page aligned            └── Pointer returned to user (16 byte aligned)
//! ```
//!
//! - `malloc` searches the free list first-fit and only maps a new arena on a
//!   miss. Blocks are neither split nor coalesced.
//! - `free` pushes the block on the list; freeing a free block is reported and
//!   ignored.
//! - `calloc` returns null for a zero count or size and on overflow, otherwise
//!   zero-fills the block.
//! - `realloc` shrinks in place by lowering the recorded size and grows by
//!   moving to a new block.
//!
//! ## Limitations
//!
//! - **One lock per heap**: arena growth is serialized with everything else
//! - **No memory is returned to the OS**: arenas live until the process exits
//! - **Alignment**: payloads are 16 byte aligned, nothing stronger
//! - **Unix-only**: requires `libc` and `mmap`
//!
//! ## Safety
//!
//! `free` and `realloc` trust their pointer argument. Passing a pointer that
//! did not come from the same heap is undefined behaviour.

pub mod align;
pub mod arena;
mod block;
pub mod config;
mod derived;
mod diag;
#[cfg(feature = "c-abi")]
pub mod ffi;
mod free_list;
pub mod global;
mod heap;
mod state;

pub use arena::{Arena, ArenaError, ArenaProvider, MmapArena};
pub use block::{HEADER_ALIGN, HEADER_SIZE};
pub use config::{ConfigError, FATAL_EXIT_CODE, HeapConfig, OsFailurePolicy};
pub use global::{MapAlloc, calloc, free, malloc, realloc};
pub use heap::{Heap, HeapStats};
