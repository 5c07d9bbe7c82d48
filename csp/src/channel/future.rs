//! Futures returned by [`Channel::put`](super::Channel::put),
//! [`Channel::pop`](super::Channel::pop) and [`Channel::ready`](super::Channel::ready).
//!
//! All three are lazy: the channel transition runs on the first poll. Dropping a
//! future whose operation is still queued removes it from the channel.

use super::core::{ChannelShared, PopSlot, PutSlot, ReadySlot, Start};
use crate::error::SendError;

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

enum Progress<V> {
  Init,
  Queued(V),
  Done,
}

// --- PutFuture ---

enum PutProgress<T> {
  Init(T),
  Queued(PutSlot<T>),
  Done,
}

/// A future that completes once a consumer has taken the value, or the put was
/// rejected by a closed channel.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct PutFuture<'a, T> {
  shared: &'a ChannelShared<T>,
  progress: PutProgress<T>,
}

impl<'a, T> PutFuture<'a, T> {
  pub(super) fn new(shared: &'a ChannelShared<T>, item: T) -> Self {
    Self {
      shared,
      progress: PutProgress::Init(item),
    }
  }
}

impl<T> fmt::Debug for PutFuture<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PutFuture")
      .field("queued", &matches!(self.progress, PutProgress::Queued(_)))
      .finish_non_exhaustive()
  }
}

// The value is never pinned in place; it is moved into the channel on first poll.
impl<T> Unpin for PutFuture<'_, T> {}

impl<T> Future for PutFuture<'_, T> {
  type Output = Result<(), SendError<T>>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    loop {
      match mem::replace(&mut this.progress, PutProgress::Done) {
        PutProgress::Init(item) => match this.shared.start_put(item) {
          Start::Done(result) => return Poll::Ready(result),
          Start::Queued(slot) => this.progress = PutProgress::Queued(slot),
        },
        PutProgress::Queued(slot) => match slot.poll_take(cx) {
          Poll::Ready(result) => return Poll::Ready(result),
          Poll::Pending => {
            this.progress = PutProgress::Queued(slot);
            return Poll::Pending;
          }
        },
        PutProgress::Done => panic!("PutFuture polled after completion"),
      }
    }
  }
}

impl<T> Drop for PutFuture<'_, T> {
  fn drop(&mut self) {
    if let PutProgress::Queued(slot) = &self.progress {
      self.shared.cancel_put(slot);
    }
  }
}

// --- PopFuture ---

/// A future that resolves to the next value, or `None` once the channel is closed.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct PopFuture<'a, T> {
  shared: &'a ChannelShared<T>,
  progress: Progress<PopSlot<T>>,
}

impl<'a, T> PopFuture<'a, T> {
  pub(super) fn new(shared: &'a ChannelShared<T>) -> Self {
    Self {
      shared,
      progress: Progress::Init,
    }
  }
}

impl<T> fmt::Debug for PopFuture<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PopFuture")
      .field("queued", &matches!(self.progress, Progress::Queued(_)))
      .finish_non_exhaustive()
  }
}

impl<T> Unpin for PopFuture<'_, T> {}

impl<T> Future for PopFuture<'_, T> {
  type Output = Option<T>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    poll_pop(this.shared, &mut this.progress, cx)
  }
}

impl<T> Drop for PopFuture<'_, T> {
  fn drop(&mut self) {
    if let Progress::Queued(slot) = &self.progress {
      self.shared.cancel_pop(slot);
    }
  }
}

/// Shared by `PopFuture` and `PopStream`: the stream restarts from `Init`
/// after every item.
pub(super) struct PopProgress<T>(Progress<PopSlot<T>>);

impl<T> PopProgress<T> {
  pub(super) fn new() -> Self {
    PopProgress(Progress::Init)
  }

  pub(super) fn poll(&mut self, shared: &ChannelShared<T>, cx: &mut Context<'_>) -> Poll<Option<T>> {
    let polled = poll_pop(shared, &mut self.0, cx);
    if polled.is_ready() {
      self.0 = Progress::Init;
    }
    polled
  }

  pub(super) fn cancel(&mut self, shared: &ChannelShared<T>) {
    if let Progress::Queued(slot) = &self.0 {
      shared.cancel_pop(slot);
    }
    self.0 = Progress::Init;
  }
}

fn poll_pop<T>(
  shared: &ChannelShared<T>,
  progress: &mut Progress<PopSlot<T>>,
  cx: &mut Context<'_>,
) -> Poll<Option<T>> {
  loop {
    match progress {
      Progress::Init => match shared.start_pop() {
        Start::Done(value) => {
          *progress = Progress::Done;
          return Poll::Ready(value);
        }
        Start::Queued(slot) => *progress = Progress::Queued(slot),
      },
      Progress::Queued(slot) => {
        let value = std::task::ready!(slot.poll_take(cx));
        *progress = Progress::Done;
        return Poll::Ready(value);
      }
      Progress::Done => panic!("PopFuture polled after completion"),
    }
  }
}

// --- ReadyFuture ---

/// A future that resolves to its token once a pop on the channel would complete
/// immediately (a put is waiting, or the channel is closed). Consumes nothing.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct ReadyFuture<'a, T> {
  shared: &'a ChannelShared<T>,
  token: usize,
  progress: Progress<ReadySlot>,
}

impl<'a, T> ReadyFuture<'a, T> {
  pub(super) fn new(shared: &'a ChannelShared<T>, token: usize) -> Self {
    Self {
      shared,
      token,
      progress: Progress::Init,
    }
  }
}

impl<T> fmt::Debug for ReadyFuture<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReadyFuture")
      .field("token", &self.token)
      .field("queued", &matches!(self.progress, Progress::Queued(_)))
      .finish()
  }
}

impl<T> Unpin for ReadyFuture<'_, T> {}

impl<T> Future for ReadyFuture<'_, T> {
  type Output = usize;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<usize> {
    let this = self.get_mut();
    loop {
      match &this.progress {
        Progress::Init => match this.shared.start_ready(this.token) {
          Start::Done(token) => {
            this.progress = Progress::Done;
            return Poll::Ready(token);
          }
          Start::Queued(slot) => this.progress = Progress::Queued(slot),
        },
        Progress::Queued(slot) => {
          let token = std::task::ready!(slot.poll_take(cx));
          this.progress = Progress::Done;
          return Poll::Ready(token);
        }
        Progress::Done => panic!("ReadyFuture polled after completion"),
      }
    }
  }
}

impl<T> Drop for ReadyFuture<'_, T> {
  fn drop(&mut self) {
    if let Progress::Queued(slot) = &self.progress {
      self.shared.cancel_ready(slot);
    }
  }
}
