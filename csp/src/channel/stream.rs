use super::core::ChannelShared;
use super::future::PopProgress;

use futures_core::{FusedStream, Stream};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// The iteration view of a channel: repeated `pop()` until end-of-stream.
///
/// Created by [`Channel::stream`](super::Channel::stream). Holds its own handle
/// to the channel, so it can be moved into a spawned task. Dropping the stream
/// cancels its pending pop, if any.
#[must_use = "streams do nothing unless polled"]
pub struct PopStream<T> {
  shared: Arc<ChannelShared<T>>,
  progress: PopProgress<T>,
  finished: bool,
}

impl<T> PopStream<T> {
  pub(super) fn new(shared: Arc<ChannelShared<T>>) -> Self {
    PopStream {
      shared,
      progress: PopProgress::new(),
      finished: false,
    }
  }
}

impl<T> fmt::Debug for PopStream<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PopStream")
      .field("shared", &self.shared)
      .field("finished", &self.finished)
      .finish()
  }
}

impl<T> Unpin for PopStream<T> {}

impl<T> Stream for PopStream<T> {
  type Item = T;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
    let this = self.get_mut();
    if this.finished {
      return Poll::Ready(None);
    }
    let next = std::task::ready!(this.progress.poll(&this.shared, cx));
    if next.is_none() {
      this.finished = true;
    }
    Poll::Ready(next)
  }
}

impl<T> FusedStream for PopStream<T> {
  fn is_terminated(&self) -> bool {
    self.finished
  }
}

impl<T> Drop for PopStream<T> {
  fn drop(&mut self) {
    self.progress.cancel(&self.shared);
  }
}
