//! Timer helpers built on `tokio::time`.
//!
//! Durations are given in milliseconds as `i64` and must lie in
//! `0..=i32::MAX`; anything else is rejected with a [`RangeError`] before a
//! timer is created.

use crate::channel::Channel;
use crate::error::{CloseError, RangeError};
use crate::runtime::{TaskSpawner, TokioSpawner};

use std::future::Future;
use std::time::Duration;

/// Returns a future that completes after `millis` milliseconds.
///
/// # Errors
///
/// Returns `Err(RangeError)` if `millis` is negative or larger than `i32::MAX`.
pub fn delay(millis: i64) -> Result<impl Future<Output = ()>, RangeError> {
  let millis = RangeError::check(millis)?;
  Ok(tokio::time::sleep(Duration::from_millis(millis)))
}

/// Returns a channel that delivers the elapsed duration once, after `millis`
/// milliseconds, and is closed as soon as that value has been taken.
///
/// The timer task is spawned on the current Tokio runtime and holds its put
/// until a consumer pops it.
///
/// # Errors
///
/// Returns `Err(RangeError)` if `millis` is negative or larger than `i32::MAX`.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn after(millis: i64) -> Result<Channel<Duration>, RangeError> {
  let millis = RangeError::check(millis)?;
  Ok(spawn_timer(millis, &TokioSpawner::new()))
}

/// Like [`after`], spawning the timer task with `spawner`.
///
/// The task sleeps with `tokio::time`, so the spawner must run it inside a
/// Tokio runtime.
pub fn after_with_spawner<S: TaskSpawner + ?Sized>(
  millis: i64,
  spawner: &S,
) -> Result<Channel<Duration>, RangeError> {
  let millis = RangeError::check(millis)?;
  Ok(spawn_timer(millis, spawner))
}

fn spawn_timer<S: TaskSpawner + ?Sized>(millis: u64, spawner: &S) -> Channel<Duration> {
  let elapsed = Duration::from_millis(millis);
  let chan = Channel::new();
  let timer = chan.clone();
  spawner.spawn(Box::pin(async move {
    tokio::time::sleep(elapsed).await;
    match timer.put(elapsed).await {
      Ok(()) => {
        if let Err(CloseError) = timer.close() {
          tracing::trace!("timer channel closed by its consumer after firing");
        }
      }
      // Closed by a consumer before firing.
      Err(_) => tracing::trace!("timer channel closed before it fired"),
    }
  }));
  chan
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn delay_completes_after_duration() {
    let start = tokio::time::Instant::now();
    delay(250).unwrap().await;
    assert!(start.elapsed() >= Duration::from_millis(250));
  }

  #[test]
  fn out_of_range_is_rejected_synchronously() {
    assert_eq!(delay(-1).err(), Some(RangeError { millis: -1 }));
    assert_eq!(after(i64::from(i32::MAX) + 1).err(), Some(RangeError { millis: 2147483648 }));
  }

  #[tokio::test(start_paused = true)]
  async fn after_with_spawner_uses_the_given_runtime() {
    let spawner = TokioSpawner::from_handle(tokio::runtime::Handle::current());
    let chan = after_with_spawner(5, &spawner).unwrap();
    assert_eq!(chan.pop().await, Some(Duration::from_millis(5)));
    assert_eq!(chan.pop().await, None);
    assert!(after_with_spawner(-5, &spawner).is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn after_delivers_then_closes() {
    let chan = after(10).unwrap();
    assert_eq!(chan.pop().await, Some(Duration::from_millis(10)));
    assert_eq!(chan.pop().await, None);
    assert!(chan.is_closed());
  }
}
