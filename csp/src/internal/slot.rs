//! A single-assignment completion cell shared between a queued waiter and the
//! future that is waiting on it.
//!
//! A slot moves `Pending -> Ready -> Taken` exactly once. It is fulfilled by the
//! channel while the channel lock is held; the waker it hands back is woken by
//! the caller after that lock has been released.

use futures_util::task::AtomicWaker;

use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::task::{Context, Poll, Waker};

enum SlotState<V> {
  Pending,
  Ready(V),
  Taken,
}

pub(crate) struct Slot<V> {
  state: Mutex<SlotState<V>>,
  waker: AtomicWaker,
}

impl<V> fmt::Debug for Slot<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match &*self.state.lock() {
      SlotState::Pending => "Pending",
      SlotState::Ready(_) => "Ready",
      SlotState::Taken => "Taken",
    };
    f.debug_struct("Slot").field("state", &state).finish_non_exhaustive()
  }
}

impl<V> Slot<V> {
  pub(crate) fn new() -> Self {
    Slot {
      state: Mutex::new(SlotState::Pending),
      waker: AtomicWaker::new(),
    }
  }

  /// Stores the outcome and returns the waker to notify, if one is registered.
  ///
  /// The caller wakes it once it no longer holds the channel lock.
  #[must_use = "the returned waker must be woken"]
  pub(crate) fn fulfill(&self, value: V) -> Option<Waker> {
    let mut state = self.state.lock();
    debug_assert!(
      matches!(*state, SlotState::Pending),
      "completion slot fulfilled twice"
    );
    *state = SlotState::Ready(value);
    drop(state);
    self.waker.take()
  }

  #[cfg(test)]
  pub(crate) fn is_pending(&self) -> bool {
    matches!(*self.state.lock(), SlotState::Pending)
  }

  /// Takes the outcome if it has been stored.
  pub(crate) fn try_take(&self) -> Option<V> {
    let mut state = self.state.lock();
    match mem::replace(&mut *state, SlotState::Taken) {
      SlotState::Ready(value) => Some(value),
      SlotState::Pending => {
        *state = SlotState::Pending;
        None
      }
      SlotState::Taken => panic!("completion slot polled after its value was taken"),
    }
  }

  pub(crate) fn poll_take(&self, cx: &mut Context<'_>) -> Poll<V> {
    if let Some(value) = self.try_take() {
      return Poll::Ready(value);
    }

    self.waker.register(cx.waker());

    // Re-check: the slot may have been fulfilled while we registered.
    match self.try_take() {
      Some(value) => Poll::Ready(value),
      None => Poll::Pending,
    }
  }
}

/// Wakes every collected waker. Called after the channel lock is released.
pub(crate) fn wake_all(wakers: Vec<Waker>) {
  for waker in wakers {
    waker.wake();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures_util::task::noop_waker;

  #[test]
  fn fulfill_then_take() {
    let slot = Slot::new();
    assert!(slot.is_pending());
    assert!(slot.fulfill(5).is_none());
    assert!(!slot.is_pending());

    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    assert_eq!(slot.poll_take(&mut cx), Poll::Ready(5));
  }

  #[test]
  fn pending_registers_waker() {
    let slot = Slot::<u8>::new();
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    assert_eq!(slot.poll_take(&mut cx), Poll::Pending);
    assert!(slot.fulfill(1).is_some(), "registered waker should be handed back");
    assert_eq!(slot.try_take(), Some(1));
  }

  #[test]
  #[should_panic(expected = "polled after its value was taken")]
  fn take_twice_panics() {
    let slot = Slot::new();
    let _ = slot.fulfill(());
    assert_eq!(slot.try_take(), Some(()));
    let _ = slot.try_take();
  }
}
