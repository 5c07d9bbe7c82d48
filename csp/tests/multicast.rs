// tests/multicast.rs

mod common;
use common::*;

use fibre_csp::{chan, Channel, Multicast, TaskSpawner, TokioSpawner};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::timeout;

#[tokio::test]
async fn three_copies_see_every_value_in_order() {
  init_tracing();
  let source = chan::<usize>();
  let multicast = Multicast::new(source.clone());
  let copies: Vec<Channel<usize>> = (0..3).map(|_| multicast.copy()).collect();

  for i in 0..ITEMS_MEDIUM {
    let producer = source.clone();
    tokio::spawn(async move { producer.put(i).await });
    for copy in &copies {
      assert_eq!(timeout(SHORT_TIMEOUT, copy.pop()).await.unwrap(), Some(i));
    }
  }

  source.close().unwrap();
  for copy in &copies {
    assert_eq!(timeout(SHORT_TIMEOUT, copy.pop()).await.unwrap(), None);
    assert!(copy.is_closed());
  }
}

#[tokio::test]
async fn late_copy_gets_no_replay() {
  let source = chan::<&str>();
  let multicast = Multicast::new(source.clone());
  let early = multicast.copy();

  let producer = source.clone();
  tokio::spawn(async move { producer.put("first").await });
  assert_eq!(timeout(SHORT_TIMEOUT, early.pop()).await.unwrap(), Some("first"));

  let late = multicast.copy();
  let producer = source.clone();
  tokio::spawn(async move { producer.put("second").await });
  assert_eq!(timeout(SHORT_TIMEOUT, early.pop()).await.unwrap(), Some("second"));
  assert_eq!(timeout(SHORT_TIMEOUT, late.pop()).await.unwrap(), Some("second"));
}

#[tokio::test]
async fn subscriber_closed_mid_delivery_is_skipped() {
  init_tracing();
  let source = chan::<u8>();
  let multicast = Multicast::new(source.clone());
  let stalled = multicast.copy();
  let live = multicast.copy();

  let producer = source.clone();
  tokio::spawn(async move { producer.put(1).await });
  // The driver is now parked on the first subscriber.
  settle(|| stalled.pending_puts() == 1).await;
  stalled.close().unwrap();

  assert_eq!(timeout(SHORT_TIMEOUT, live.pop()).await.unwrap(), Some(1));
  assert_eq!(stalled.pop().await, None);
}

#[tokio::test]
async fn slow_subscriber_holds_back_the_others_and_the_source() {
  let source = chan::<u32>();
  let multicast = Multicast::new(source.clone());
  let slow = multicast.copy();
  let fast = multicast.copy();

  let producer = source.clone();
  let feeder = tokio::spawn(async move {
    producer.put(1).await.unwrap();
    producer.put(2).await.unwrap();
  });

  // The driver is parked on `slow`, so `fast` sees nothing and 2 stays queued.
  settle(|| slow.pending_puts() == 1).await;
  assert!(timeout(SHORT_TIMEOUT, fast.pop()).await.is_err());
  settle(|| source.pending_puts() == 1).await;
  assert!(!feeder.is_finished());

  assert_eq!(slow.pop().await, Some(1));
  assert_eq!(timeout(SHORT_TIMEOUT, fast.pop()).await.unwrap(), Some(1));

  // Same again for the second value.
  settle(|| slow.pending_puts() == 1).await;
  assert!(timeout(SHORT_TIMEOUT, fast.pop()).await.is_err());

  assert_eq!(slow.pop().await, Some(2));
  assert_eq!(timeout(SHORT_TIMEOUT, fast.pop()).await.unwrap(), Some(2));
  timeout(SHORT_TIMEOUT, feeder).await.unwrap().unwrap();
}

struct CountingSpawner {
  spawned: AtomicUsize,
  inner: TokioSpawner,
}

impl TaskSpawner for CountingSpawner {
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
    self.spawned.fetch_add(1, Ordering::SeqCst);
    self.inner.spawn(future);
  }
}

#[tokio::test]
async fn driver_runs_on_injected_spawner() {
  let spawner = Arc::new(CountingSpawner {
    spawned: AtomicUsize::new(0),
    inner: TokioSpawner::new(),
  });
  let source = chan::<u32>();
  let multicast = Multicast::with_spawner(source.clone(), spawner.as_ref());
  assert_eq!(spawner.spawned.load(Ordering::SeqCst), 1);

  let sub = multicast.copy();
  let producer = source.clone();
  tokio::spawn(async move { producer.put(42).await });
  assert_eq!(timeout(SHORT_TIMEOUT, sub.pop()).await.unwrap(), Some(42));
  assert_eq!(multicast.subscriber_count(), 1);
}
