use std::{future::Future, pin::Pin};

/// A trait for spawning a future onto an asynchronous runtime.
///
/// [`Multicast`](crate::Multicast) and the timer helpers need to run a
/// background task; this is the seam through which the executor is chosen.
pub trait TaskSpawner: Send + Sync + 'static {
  /// Spawns a type-erased future. The future must be driven to completion
  /// independently of the caller.
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>);
}

/// Spawns onto a Tokio runtime.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioSpawner(tokio::runtime::Handle);

#[cfg(feature = "tokio")]
impl TokioSpawner {
  /// Creates a spawner that uses the current Tokio runtime context.
  /// Panics if called outside of a Tokio runtime.
  pub fn new() -> Self {
    Self(tokio::runtime::Handle::current())
  }

  /// Creates a spawner for an explicit runtime handle.
  pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
    Self(handle)
  }
}

#[cfg(feature = "tokio")]
impl TaskSpawner for TokioSpawner {
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
    self.0.spawn(future);
  }
}

#[cfg(all(test, feature = "tokio"))]
mod tests {
  use super::*;
  use crate::Channel;

  #[tokio::test]
  async fn tokio_spawner_runs_future() {
    let chan = Channel::new();
    let producer = chan.clone();
    TokioSpawner::new().spawn(Box::pin(async move {
      let _ = producer.put("spawned").await;
    }));
    assert_eq!(chan.pop().await, Some("spawned"));
  }
}
