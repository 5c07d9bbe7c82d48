// src/multicast.rs

//! Broadcast fan-out from one source channel to any number of subscribers.
//!
//! A [`Multicast`] takes over a source channel and runs a background driver
//! that pops each value and puts a clone into every subscriber, one subscriber
//! at a time. Because the subscriber channels are unbuffered, the driver only
//! moves on once every live subscriber has taken the value; a slow subscriber
//! holds back the others and, through them, the source's producers.
//!
//! When the source closes, the driver closes every subscriber and exits.
//! Subscribers created with [`Multicast::copy`] only see values popped after
//! they were registered.

use crate::channel::Channel;
use crate::error::{CloseError, SendError};
use crate::runtime::TaskSpawner;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type Subscribers<T> = Arc<Mutex<Vec<Channel<T>>>>;

/// A fan-out of one source channel into many subscriber channels.
pub struct Multicast<T> {
  subscribers: Subscribers<T>,
}

/// Shorthand for [`Multicast::new`].
#[cfg(feature = "tokio")]
pub fn multi<T: Clone + Send + 'static>(source: Channel<T>) -> Multicast<T> {
  Multicast::new(source)
}

impl<T: Clone + Send + 'static> Multicast<T> {
  /// Starts fanning out `source` on the current Tokio runtime.
  ///
  /// # Panics
  ///
  /// Panics if called outside of a Tokio runtime.
  #[cfg(feature = "tokio")]
  pub fn new(source: Channel<T>) -> Self {
    Self::with_spawner(source, &crate::runtime::TokioSpawner::new())
  }

  /// Starts fanning out `source`, spawning the driver with `spawner`.
  pub fn with_spawner<S: TaskSpawner + ?Sized>(source: Channel<T>, spawner: &S) -> Self {
    let subscribers: Subscribers<T> = Arc::new(Mutex::new(Vec::new()));
    spawner.spawn(Box::pin(drive(source, Arc::clone(&subscribers))));
    Multicast { subscribers }
  }
}

impl<T> Multicast<T> {
  /// Creates, registers and returns a new subscriber channel.
  ///
  /// If the source has already ended the driver has exited, and the returned
  /// channel is never fed nor closed by it.
  pub fn copy(&self) -> Channel<T> {
    let subscriber = Channel::new();
    self.subscribers.lock().push(subscriber.clone());
    subscriber
  }

  /// Number of subscribers registered so far, closed ones included.
  pub fn subscriber_count(&self) -> usize {
    self.subscribers.lock().len()
  }
}

impl<T> fmt::Debug for Multicast<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Multicast")
      .field("subscribers", &self.subscriber_count())
      .finish()
  }
}

async fn drive<T: Clone + Send + 'static>(source: Channel<T>, subscribers: Subscribers<T>) {
  tracing::debug!("multicast driver started");
  let mut delivered: u64 = 0;

  while let Some(value) = source.pop().await {
    // Snapshot so `copy()` never waits on a delivery in progress.
    let targets: Vec<Channel<T>> = subscribers.lock().clone();
    for target in &targets {
      if target.is_closed() {
        tracing::debug!("multicast skipped a closed subscriber");
        continue;
      }
      match target.put(value.clone()).await {
        Ok(()) => {}
        Err(SendError::ClosedWhilePending(_)) => {
          tracing::warn!("multicast subscriber closed while a value was pending");
        }
        Err(SendError::Closed(_)) => {
          tracing::debug!("multicast skipped a closed subscriber");
        }
      }
    }
    delivered += 1;
  }

  let targets: Vec<Channel<T>> = subscribers.lock().clone();
  for target in &targets {
    if let Err(CloseError) = target.close() {
      tracing::debug!("multicast subscriber was already closed by its owner");
    }
  }
  tracing::debug!(delivered, subscribers = targets.len(), "multicast driver stopped");
}

#[cfg(all(test, feature = "tokio"))]
mod tests {
  use super::*;
  use std::time::Duration;
  use tokio::time::timeout;

  const TEST_TIMEOUT: Duration = Duration::from_secs(1);

  #[tokio::test]
  async fn copies_receive_each_value() {
    let source = Channel::new();
    let multicast = Multicast::new(source.clone());
    let a = multicast.copy();
    let b = multicast.copy();
    assert_eq!(multicast.subscriber_count(), 2);

    let producer = source.clone();
    tokio::spawn(async move { producer.put(9).await });

    assert_eq!(timeout(TEST_TIMEOUT, a.pop()).await.unwrap(), Some(9));
    assert_eq!(timeout(TEST_TIMEOUT, b.pop()).await.unwrap(), Some(9));
  }

  #[tokio::test]
  async fn closed_subscriber_is_skipped() {
    let source = Channel::new();
    let multicast = multi(source.clone());
    let dead = multicast.copy();
    let live = multicast.copy();
    dead.close().unwrap();

    let producer = source.clone();
    tokio::spawn(async move { producer.put("x").await });
    assert_eq!(timeout(TEST_TIMEOUT, live.pop()).await.unwrap(), Some("x"));
    assert_eq!(multicast.subscriber_count(), 2);

    // Ending the source still closes the live subscriber past the dead one.
    source.close().unwrap();
    assert_eq!(timeout(TEST_TIMEOUT, live.pop()).await.unwrap(), None);
    assert!(dead.is_closed() && live.is_closed());
  }

  #[tokio::test]
  async fn source_close_closes_subscribers() {
    let source = Channel::<u8>::new();
    let multicast = Multicast::new(source.clone());
    let sub = multicast.copy();
    source.close().unwrap();
    assert_eq!(timeout(TEST_TIMEOUT, sub.pop()).await.unwrap(), None);
    assert!(sub.is_closed());
  }
}
