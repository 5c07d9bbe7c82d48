// src/channel/mod.rs

//! An unbuffered ("rendezvous") channel.
//!
//! A `put` and a `pop` only ever complete as a pair: a put waits until some
//! consumer takes its value, and a pop waits until some producer offers one.
//! Waiters of the same kind are served strictly in the order they arrived.
//!
//! `Channel<T>` is a handle. Cloning it is cheap and every clone addresses the
//! same channel; any clone may put, pop, probe or close. Dropping handles never
//! closes the channel, only an explicit [`Channel::close`] does.
//!
//! # Closing
//!
//! - `close()` on a closed channel fails with [`CloseError`].
//! - `put()` on a closed channel fails with
//!   [`SendError::Closed`](crate::error::SendError::Closed), returning the value.
//! - A put still waiting for a consumer when the channel closes fails with
//!   [`SendError::ClosedWhilePending`](crate::error::SendError::ClosedWhilePending),
//!   returning the value.
//! - `pop()` on a closed channel resolves to `None`, indefinitely.
//!
//! # Examples
//!
//! ```
//! use fibre_csp::Channel;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let chan = Channel::new();
//! let producer = chan.clone();
//! let handle = tokio::spawn(async move {
//!   for i in 1..=3 {
//!     producer.put(i).await.unwrap();
//!   }
//!   producer.close().unwrap();
//! });
//!
//! let mut seen = Vec::new();
//! while let Some(v) = chan.pop().await {
//!   seen.push(v);
//! }
//! assert_eq!(seen, vec![1, 2, 3]);
//! handle.await.unwrap();
//! # });
//! ```

mod core;
mod future;
mod stream;

pub use future::{PopFuture, PutFuture, ReadyFuture};
pub use stream::PopStream;

use self::core::ChannelShared;
use crate::error::CloseError;

use std::fmt;
use std::sync::Arc;

/// A handle to an unbuffered channel.
pub struct Channel<T> {
  shared: Arc<ChannelShared<T>>,
}

impl<T> Channel<T> {
  /// Creates a new, open channel with no pending operations.
  pub fn new() -> Self {
    Channel {
      shared: Arc::new(ChannelShared::new()),
    }
  }

  /// Offers `value` to the channel.
  ///
  /// The returned future completes with `Ok(())` once a consumer has taken the
  /// value. Any pending [`ready`](Channel::ready) probes are released when the
  /// put starts, since the channel is then ready to be popped.
  pub fn put(&self, value: T) -> PutFuture<'_, T> {
    PutFuture::new(&self.shared, value)
  }

  /// Takes the next value, or `None` once the channel is closed.
  pub fn pop(&self) -> PopFuture<'_, T> {
    PopFuture::new(&self.shared)
  }

  /// Resolves to `token` once a pop would complete immediately: a put is
  /// waiting, or the channel is closed. Nothing is consumed.
  ///
  /// This is the probe [`Select`](crate::Select) uses to arbitrate between
  /// channels.
  pub fn ready(&self, token: usize) -> ReadyFuture<'_, T> {
    ReadyFuture::new(&self.shared, token)
  }

  /// Closes the channel.
  ///
  /// Pending pops resolve to `None`, pending probes are released and pending
  /// puts are rejected with their value returned.
  ///
  /// # Errors
  ///
  /// Returns `Err(CloseError)` if the channel has already been closed.
  pub fn close(&self) -> Result<(), CloseError> {
    self.shared.close()
  }

  /// Returns `true` once the channel has been closed.
  pub fn is_closed(&self) -> bool {
    self.shared.is_closed()
  }

  /// Returns a stream yielding every value popped from this channel until it closes.
  pub fn stream(&self) -> PopStream<T> {
    PopStream::new(Arc::clone(&self.shared))
  }

  /// Returns `true` if both handles address the same channel.
  pub fn same_channel(&self, other: &Channel<T>) -> bool {
    Arc::ptr_eq(&self.shared, &other.shared)
  }

  /// Number of puts waiting for a consumer.
  #[inline]
  pub fn pending_puts(&self) -> usize {
    self.shared.pending_puts()
  }

  /// Number of pops waiting for a producer.
  #[inline]
  pub fn pending_pops(&self) -> usize {
    self.shared.pending_pops()
  }

  /// Number of `ready` probes waiting for the channel to become ready.
  #[inline]
  pub fn pending_probes(&self) -> usize {
    self.shared.pending_probes()
  }
}

impl<T> Clone for Channel<T> {
  fn clone(&self) -> Self {
    Channel {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T> Default for Channel<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> fmt::Debug for Channel<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Channel").field("shared", &self.shared).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::SendError;
  use futures_util::{FutureExt, StreamExt};
  use std::time::Duration;
  use tokio::time::timeout;

  const TEST_TIMEOUT: Duration = Duration::from_secs(1);

  #[tokio::test]
  async fn put_resolves_after_pop() {
    let chan = Channel::new();
    let producer = chan.clone();
    let put = tokio::spawn(async move { producer.put(1).await });

    assert_eq!(timeout(TEST_TIMEOUT, chan.pop()).await.unwrap(), Some(1));
    assert!(put.await.unwrap().is_ok());
  }

  #[tokio::test]
  async fn put_on_closed_returns_value() {
    let chan = Channel::new();
    chan.close().unwrap();
    match chan.put(String::from("x")).await {
      Err(SendError::Closed(v)) => assert_eq!(v, "x"),
      other => panic!("expected SendError::Closed, got {:?}", other),
    }
    assert_eq!(chan.pending_puts(), 0);
  }

  #[tokio::test]
  async fn double_close_fails() {
    let chan = Channel::<()>::new();
    assert_eq!(chan.close(), Ok(()));
    assert_eq!(chan.close(), Err(CloseError));
    assert!(chan.is_closed());
  }

  #[tokio::test]
  async fn dropped_put_is_withdrawn() {
    let chan = Channel::new();
    {
      let mut put = chan.put(7);
      // Poll once so the put is queued, then drop it.
      assert!((&mut put).now_or_never().is_none());
      assert_eq!(chan.pending_puts(), 1);
    }
    assert_eq!(chan.pending_puts(), 0);

    let mut pop = chan.pop();
    assert!((&mut pop).now_or_never().is_none());
  }

  #[tokio::test]
  async fn value_handed_to_dropped_pop_is_not_lost() {
    let chan = Channel::new();
    let mut pop = chan.pop();
    assert!((&mut pop).now_or_never().is_none());
    assert_eq!(chan.pending_pops(), 1);

    // The put completes against the queued pop, which is then abandoned.
    assert!(chan.put(7).await.is_ok());
    drop(pop);

    assert_eq!(timeout(TEST_TIMEOUT, chan.pop()).await.unwrap(), Some(7));
    assert_eq!(chan.pending_puts(), 0);
  }

  #[tokio::test]
  async fn ready_does_not_consume() {
    let chan = Channel::new();
    let producer = chan.clone();
    let put = tokio::spawn(async move { producer.put("v").await });

    assert_eq!(timeout(TEST_TIMEOUT, chan.ready(42)).await.unwrap(), 42);
    assert_eq!(chan.pending_puts(), 1);
    assert_eq!(chan.pop().await, Some("v"));
    put.await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn stream_ends_on_close() {
    let chan = Channel::new();
    let producer = chan.clone();
    tokio::spawn(async move {
      producer.put(1).await.unwrap();
      producer.put(2).await.unwrap();
      producer.close().unwrap();
    });

    let collected: Vec<i32> = timeout(TEST_TIMEOUT, chan.stream().collect()).await.unwrap();
    assert_eq!(collected, vec![1, 2]);
  }

  #[test]
  fn debug_does_not_require_debug_items() {
    struct Opaque;
    let chan = Channel::<Opaque>::new();
    let rendered = format!("{:?} {:?}", chan, chan.stream());
    assert!(rendered.contains("Channel"));
    assert!(rendered.contains("closed: false"));
    assert!(rendered.contains("PopStream"));
  }

  #[test]
  fn clones_share_state() {
    let a = Channel::<u8>::new();
    let b = a.clone();
    assert!(a.same_channel(&b));
    assert!(!a.same_channel(&Channel::new()));
    b.close().unwrap();
    assert!(a.is_closed());
  }
}
