//! Heap diagnostics.
//!
//! Operations record what they did into a [`Trail`] while the heap lock is
//! held, and the trail is written out through `tracing` once the lock has been
//! released. A logging backend that allocates from the same heap therefore
//! never waits on a lock its own thread holds. Events raised while a trail is
//! being written on the same thread are dropped, which stops the recursion.

use std::cell::Cell;

use tracing::{debug, error, warn};

use crate::arena::ArenaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
  ArenaMapped {
    requested: usize,
    mapped: usize,
    base: usize,
  },
  BlockCreated {
    requested: usize,
    header: usize,
    payload: usize,
  },
  BlockReused {
    requested: usize,
    size: usize,
    payload: usize,
  },
  Shrunk {
    payload: usize,
    from: usize,
    to: usize,
  },
  DoubleFree {
    payload: usize,
  },
  CallocOverflow {
    count: usize,
    element_size: usize,
  },
}

const TRAIL_CAPACITY: usize = 4;

/// Fixed-size event buffer filled under the heap lock.
///
/// A single public operation records at most a couple of events.
#[derive(Debug, Default)]
pub struct Trail {
  events: [Option<Event>; TRAIL_CAPACITY],
  len: usize,
}

impl Trail {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(
    &mut self,
    event: Event,
  ) {
    debug_assert!(self.len < TRAIL_CAPACITY, "diagnostic trail overflow");

    if let Some(slot) = self.events.get_mut(self.len) {
      *slot = Some(event);
      self.len += 1;
    }
  }

  pub fn events(&self) -> impl Iterator<Item = Event> + '_ {
    self.events[..self.len].iter().flatten().copied()
  }
}

thread_local! {
  static EMITTING: Cell<bool> = const { Cell::new(false) };
}

struct EmitGuard;

impl Drop for EmitGuard {
  fn drop(&mut self) {
    let _ = EMITTING.try_with(|flag| flag.set(false));
  }
}

/// Claims the emitter for this thread, `None` if it is already busy or the
/// thread is being torn down.
fn enter() -> Option<EmitGuard> {
  EMITTING
    .try_with(|flag| {
      if flag.replace(true) {
        None
      } else {
        Some(EmitGuard)
      }
    })
    .ok()
    .flatten()
}

pub fn emit(trail: &Trail) {
  if trail.len == 0 {
    return;
  }
  let Some(_guard) = enter() else {
    return;
  };

  for event in trail.events() {
    log_event(event);
  }
}

fn log_event(event: Event) {
  match event {
    Event::ArenaMapped {
      requested,
      mapped,
      base,
    } => debug!(
      requested,
      mapped,
      base = format_args!("{base:#x}"),
      "total memory requested from OS (page aligned)"
    ),
    Event::BlockCreated {
      requested,
      header,
      payload,
    } => debug!(
      requested,
      header = format_args!("{header:#x}"),
      payload = format_args!("{payload:#x}"),
      "allocated fresh block"
    ),
    Event::BlockReused {
      requested,
      size,
      payload,
    } => debug!(
      requested,
      size,
      payload = format_args!("{payload:#x}"),
      "reused free block"
    ),
    Event::Shrunk { payload, from, to } => debug!(
      payload = format_args!("{payload:#x}"),
      from,
      to,
      "shrunk block in place"
    ),
    Event::DoubleFree { payload } => {
      warn!(payload = format_args!("{payload:#x}"), "double free detected, ignoring")
    }
    Event::CallocOverflow {
      count,
      element_size,
    } => warn!(count, element_size, "calloc size overflow detected"),
  }
}

/// Reports an arena failure before the heap applies its failure policy.
pub fn arena_failure(err: &ArenaError) {
  let Some(_guard) = enter() else {
    return;
  };

  error!(error = %err, "failed to map arena");
}
