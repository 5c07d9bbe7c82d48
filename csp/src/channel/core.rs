//! The shared state and transition logic of a rendezvous channel.
//!
//! ### Design Principles:
//!
//! 1.  **Central Mutex**: a `parking_lot::Mutex` guards the closed flag and the
//!     three waiter queues. It is held only for a single transition and never
//!     across an `.await`.
//! 2.  **Zero capacity**: there is no item buffer. A value lives either in a
//!     queued put-waiter or in the completion slot of the pop it was handed to.
//! 3.  **Wake outside the lock**: transitions fulfil completion slots under the
//!     lock and collect the wakers; they are woken after the guard is dropped.

use crate::error::{CloseError, SendError};
use crate::internal::slot::{self, Slot};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::task::Waker;

pub(crate) type PopSlot<T> = Arc<Slot<Option<T>>>;
pub(crate) type PutSlot<T> = Arc<Slot<Result<(), SendError<T>>>>;
pub(crate) type ReadySlot = Arc<Slot<usize>>;

/// The outcome of starting an operation: either it completed in the same step,
/// or it was queued and will be completed through its slot.
pub(crate) enum Start<V> {
  Done(V),
  Queued(Arc<Slot<V>>),
}

pub(crate) struct PutWaiter<T> {
  item: T,
  slot: PutSlot<T>,
}

pub(crate) struct ReadyWaiter {
  token: usize,
  slot: ReadySlot,
}

pub(crate) struct ChannelState<T> {
  closed: bool,
  pending_pops: VecDeque<PopSlot<T>>,
  pending_puts: VecDeque<PutWaiter<T>>,
  ready_waiters: VecDeque<ReadyWaiter>,
}

impl<T> fmt::Debug for ChannelState<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ChannelState")
      .field("closed", &self.closed)
      .field("pending_pops", &self.pending_pops.len())
      .field("pending_puts", &self.pending_puts.len())
      .field("ready_waiters", &self.ready_waiters.len())
      .finish()
  }
}

impl<T> ChannelState<T> {
  #[inline]
  fn check_invariants(&self) {
    debug_assert!(
      self.pending_pops.is_empty() || self.pending_puts.is_empty(),
      "rendezvous channel has both pending pops and pending puts"
    );
    debug_assert!(
      !self.closed || (self.pending_pops.is_empty() && self.pending_puts.is_empty()),
      "closed channel still holds pending pops or puts"
    );
    debug_assert!(
      self.ready_waiters.is_empty() || (!self.closed && self.pending_puts.is_empty()),
      "ready waiters queued on a channel that is already ready"
    );
  }

  /// Resolves and clears every ready-waiter, collecting their wakers.
  fn release_ready_waiters(&mut self, wakers: &mut Vec<Waker>) {
    for waiter in self.ready_waiters.drain(..) {
      wakers.extend(waiter.slot.fulfill(waiter.token));
    }
  }
}

/// The shared owner of a channel's state, designed to be wrapped in an `Arc`.
pub(crate) struct ChannelShared<T> {
  state: Mutex<ChannelState<T>>,
}

impl<T> fmt::Debug for ChannelShared<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ChannelShared")
      .field("state", &*self.state.lock())
      .finish()
  }
}

impl<T> ChannelShared<T> {
  pub(crate) fn new() -> Self {
    ChannelShared {
      state: Mutex::new(ChannelState {
        closed: false,
        pending_pops: VecDeque::new(),
        pending_puts: VecDeque::new(),
        ready_waiters: VecDeque::new(),
      }),
    }
  }

  /// Offers `item` to the channel. In order:
  /// 1. Reject it if the channel is closed.
  /// 2. Release every ready-waiter, the channel is now ready.
  /// 3. Hand it to the oldest pending pop, completing both sides.
  /// 4. Otherwise queue it until a pop or a close resolves it.
  pub(crate) fn start_put(&self, item: T) -> Start<Result<(), SendError<T>>> {
    let mut wakers = Vec::new();
    let start = {
      let mut guard = self.state.lock();

      if guard.closed {
        return Start::Done(Err(SendError::Closed(item)));
      }

      guard.release_ready_waiters(&mut wakers);

      let start = if let Some(pop_slot) = guard.pending_pops.pop_front() {
        tracing::trace!("put handed off to a pending pop");
        wakers.extend(pop_slot.fulfill(Some(item)));
        Start::Done(Ok(()))
      } else {
        let slot = Arc::new(Slot::new());
        guard.pending_puts.push_back(PutWaiter {
          item,
          slot: Arc::clone(&slot),
        });
        Start::Queued(slot)
      };
      guard.check_invariants();
      start
    };
    slot::wake_all(wakers);
    start
  }

  /// Asks the channel for its next value. In order:
  /// 1. End-of-stream if the channel is closed.
  /// 2. Take the value of the oldest pending put, completing that put.
  /// 3. Otherwise queue until a put or a close resolves it.
  pub(crate) fn start_pop(&self) -> Start<Option<T>> {
    let mut guard = self.state.lock();

    if guard.closed {
      return Start::Done(None);
    }

    if let Some(PutWaiter { item, slot }) = guard.pending_puts.pop_front() {
      let waker = slot.fulfill(Ok(()));
      guard.check_invariants();
      drop(guard);
      tracing::trace!("pop took the value of a pending put");
      if let Some(waker) = waker {
        waker.wake();
      }
      return Start::Done(Some(item));
    }

    let slot = Arc::new(Slot::new());
    guard.pending_pops.push_back(Arc::clone(&slot));
    guard.check_invariants();
    Start::Queued(slot)
  }

  /// Probes whether a pop would complete right now, without consuming anything.
  pub(crate) fn start_ready(&self, token: usize) -> Start<usize> {
    let mut guard = self.state.lock();

    if guard.closed || !guard.pending_puts.is_empty() {
      return Start::Done(token);
    }

    let slot = Arc::new(Slot::new());
    guard.ready_waiters.push_back(ReadyWaiter {
      token,
      slot: Arc::clone(&slot),
    });
    guard.check_invariants();
    Start::Queued(slot)
  }

  /// Closes the channel: pending pops see end-of-stream, ready-waiters are
  /// released, pending puts are rejected with their value returned.
  pub(crate) fn close(&self) -> Result<(), CloseError> {
    let mut wakers = Vec::new();
    let (pops, puts, probes) = {
      let mut guard = self.state.lock();
      if guard.closed {
        return Err(CloseError);
      }

      let pops = guard.pending_pops.len();
      for pop_slot in guard.pending_pops.drain(..) {
        wakers.extend(pop_slot.fulfill(None));
      }

      let probes = guard.ready_waiters.len();
      guard.release_ready_waiters(&mut wakers);

      let puts = guard.pending_puts.len();
      for PutWaiter { item, slot } in guard.pending_puts.drain(..) {
        wakers.extend(slot.fulfill(Err(SendError::ClosedWhilePending(item))));
      }

      guard.closed = true;
      guard.check_invariants();
      (pops, puts, probes)
    };
    slot::wake_all(wakers);

    tracing::debug!(
      pending_pops = pops,
      pending_puts = puts,
      ready_waiters = probes,
      "channel closed"
    );
    if puts > 0 {
      tracing::debug!(rejected = puts, "close rejected puts that were still waiting for a consumer");
    }
    Ok(())
  }

  pub(crate) fn is_closed(&self) -> bool {
    self.state.lock().closed
  }

  // --- Cancellation: a dropped future removes its waiter. ---

  pub(crate) fn cancel_put(&self, slot: &PutSlot<T>) {
    let mut guard = self.state.lock();
    let before = guard.pending_puts.len();
    guard.pending_puts.retain(|w| !Arc::ptr_eq(&w.slot, slot));
    if guard.pending_puts.len() != before {
      tracing::trace!("pending put cancelled, value dropped");
    }
  }

  /// Withdraws a pop. If a put already handed it a value that was never
  /// taken, the value goes back to the channel: to the oldest pending pop, or
  /// to the front of the put queue as a put that has already completed.
  pub(crate) fn cancel_pop(&self, slot: &PopSlot<T>) {
    let mut wakers = Vec::new();
    {
      let mut guard = self.state.lock();
      let before = guard.pending_pops.len();
      guard.pending_pops.retain(|s| !Arc::ptr_eq(s, slot));
      if guard.pending_pops.len() != before {
        return;
      }

      let item = match slot.try_take() {
        Some(Some(item)) => item,
        _ => return,
      };

      if guard.closed {
        tracing::warn!("pop dropped after a value was handed to it on a closed channel, value dropped");
        return;
      }

      if let Some(next) = guard.pending_pops.pop_front() {
        tracing::trace!("value of a dropped pop handed to the next pending pop");
        wakers.extend(next.fulfill(Some(item)));
      } else {
        tracing::trace!("value of a dropped pop returned to the channel");
        guard.release_ready_waiters(&mut wakers);
        guard.pending_puts.push_front(PutWaiter {
          item,
          slot: Arc::new(Slot::new()),
        });
      }
      guard.check_invariants();
    }
    slot::wake_all(wakers);
  }

  pub(crate) fn cancel_ready(&self, slot: &ReadySlot) {
    self
      .state
      .lock()
      .ready_waiters
      .retain(|w| !Arc::ptr_eq(&w.slot, slot));
  }

  // --- Diagnostics ---

  pub(crate) fn pending_puts(&self) -> usize {
    self.state.lock().pending_puts.len()
  }

  pub(crate) fn pending_pops(&self) -> usize {
    self.state.lock().pending_pops.len()
  }

  pub(crate) fn pending_probes(&self) -> usize {
    self.state.lock().ready_waiters.len()
  }
}
