//! Go-style communicating sequential processes for async Rust.
//!
//! `fibre_csp` provides unbuffered ("rendezvous") channels, a multi-way
//! [`Select`] over channels with an optional default branch, and a
//! [`Multicast`] that fans one channel out to many subscribers.
//!
//! A [`put`](Channel::put) completes only once a [`pop`](Channel::pop) has
//! taken its value, and vice versa. Waiters are served first in, first out.
//! Closing a channel releases every waiter: pending pops resolve to `None`,
//! pending puts get their value back in a [`SendError`].
//!
//! The primitives are executor-agnostic and `Send + Sync` for `T: Send`.
//! The `tokio` feature (on by default) adds [`TokioSpawner`], [`Multicast::new`]
//! and the timer helpers [`delay`] and [`after`].
//!
//! ```
//! use fibre_csp::{chan, Select};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let jobs = chan::<u32>();
//! let quit = chan::<()>();
//!
//! let worker = {
//!   let (jobs, quit) = (jobs.clone(), quit.clone());
//!   tokio::spawn(async move {
//!     let mut total = 0;
//!     loop {
//!       let done = Select::new()
//!         .recv(&jobs, |job| async move { (job, false) })
//!         .recv(&quit, |_| async { (None, true) })
//!         .await;
//!       match done {
//!         (Some(n), _) => total += n,
//!         (None, _) => return total,
//!       }
//!     }
//!   })
//! };
//!
//! for n in 1..=4 {
//!   jobs.put(n).await.unwrap();
//! }
//! quit.close().unwrap();
//! assert_eq!(worker.await.unwrap(), 10);
//! # });
//! ```

pub mod capability;
pub mod channel;
pub mod error;
pub mod multicast;
pub mod runtime;
pub mod select;
#[cfg(feature = "tokio")]
pub mod timer;

mod internal;

pub use capability::{Chan, Closable, Pop, Put, Selectable};
pub use channel::{Channel, PopStream};
pub use error::{CloseError, RangeError, SendError};
pub use multicast::Multicast;
pub use runtime::TaskSpawner;
pub use select::{last, select, Select, SelectFuture};

#[cfg(feature = "tokio")]
pub use multicast::multi;
#[cfg(feature = "tokio")]
pub use runtime::TokioSpawner;
#[cfg(feature = "tokio")]
pub use timer::{after, after_with_spawner, delay};

/// Creates a new unbuffered channel. Shorthand for [`Channel::new`].
pub fn chan<T>() -> Channel<T> {
  Channel::new()
}
