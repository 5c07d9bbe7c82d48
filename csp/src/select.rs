// src/select.rs

//! A Go-style `select` over several channels.
//!
//! Each branch pairs a channel with a handler. The select registers a
//! non-destructive [`ready`](crate::Selectable::ready) probe on every branch,
//! waits for the first one to resolve, then pops from that channel only and
//! runs its handler with the popped value (`None` if the channel was closed).
//! Channels that were ready but not chosen keep their values.
//!
//! ### Arbitration rules
//!
//! - Probes are polled in branch order; when several are ready in the same
//!   poll, the lowest index wins. There is no other priority, so a channel
//!   that is always ready can starve a sibling listed after it.
//! - A default branch runs only if no probe is ready on the first poll *and*
//!   none becomes ready during one deferred scheduler tick. A channel that is
//!   ready, or becomes ready within that tick, always beats the default. This
//!   keeps a polling loop of `select`-with-default from starving real readiness.
//! - Losing probes are dropped when the winner is chosen, which withdraws them
//!   from their channels without consuming anything. The chosen `pop` is not
//!   cancelled: if another consumer took the value in between, the select
//!   waits for the next one.
//! - A select with no branches and no default never completes.
//!
//! # Examples
//!
//! ```
//! use fibre_csp::{Channel, Select};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let numbers = Channel::<u32>::new();
//! let words = Channel::<&str>::new();
//! let closed = Channel::<()>::new();
//! closed.close().unwrap();
//!
//! let picked = Select::new()
//!   .recv(&numbers, |n| async move { format!("number {:?}", n) })
//!   .recv(&words, |w| async move { format!("word {:?}", w) })
//!   .recv(&closed, |_| async { String::from("closed") })
//!   .default_case(|| async { String::from("nothing ready") })
//!   .await;
//! assert_eq!(picked, "closed");
//! # });
//! ```

use crate::capability::Selectable;

use futures_util::future::BoxFuture;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

type DefaultHandler<'a, R> = Box<dyn FnOnce() -> BoxFuture<'a, R> + Send + 'a>;

/// One `(channel, handler)` pair, with the item type erased.
trait Branch<'a, R>: Send {
  fn poll_ready(&mut self, token: usize, cx: &mut Context<'_>) -> Poll<usize>;
  fn fire(self: Box<Self>) -> BoxFuture<'a, R>;
}

struct RecvBranch<'a, T, S: ?Sized, F> {
  channel: &'a S,
  handler: F,
  probe: Option<BoxFuture<'a, usize>>,
  _item: PhantomData<fn() -> T>,
}

impl<'a, T, S, F, Fut, R> Branch<'a, R> for RecvBranch<'a, T, S, F>
where
  T: Send + 'a,
  S: Selectable<T> + Sync + ?Sized + 'a,
  F: FnOnce(Option<T>) -> Fut + Send + 'a,
  Fut: Future<Output = R> + Send + 'a,
{
  fn poll_ready(&mut self, token: usize, cx: &mut Context<'_>) -> Poll<usize> {
    let channel = self.channel;
    let probe = self.probe.get_or_insert_with(|| channel.ready(token));
    probe.as_mut().poll(cx)
  }

  fn fire(self: Box<Self>) -> BoxFuture<'a, R> {
    let RecvBranch {
      channel,
      handler,
      probe,
      ..
    } = *self;
    drop(probe);
    Box::pin(async move {
      let value = channel.pop().await;
      handler(value).await
    })
  }
}

/// Builder for a select over channels whose handlers all produce an `R`.
///
/// Awaiting the builder runs the select (it implements [`IntoFuture`]).
#[must_use = "a select does nothing unless you .await it"]
pub struct Select<'a, R> {
  branches: Vec<Box<dyn Branch<'a, R> + 'a>>,
  default: Option<DefaultHandler<'a, R>>,
}

/// Shorthand for [`Select::new`].
pub fn select<'a, R: 'a>() -> Select<'a, R> {
  Select::new()
}

impl<'a, R: 'a> Select<'a, R> {
  /// Creates a select with no branches.
  pub fn new() -> Self {
    Select {
      branches: Vec::new(),
      default: None,
    }
  }

  /// Adds a branch that pops from `channel` and passes the value to `handler`.
  ///
  /// The handler receives `None` if the channel was closed.
  pub fn recv<T, S, F, Fut>(mut self, channel: &'a S, handler: F) -> Self
  where
    T: Send + 'a,
    S: Selectable<T> + Sync + ?Sized + 'a,
    F: FnOnce(Option<T>) -> Fut + Send + 'a,
    Fut: Future<Output = R> + Send + 'a,
  {
    self.branches.push(Box::new(RecvBranch {
      channel,
      handler,
      probe: None,
      _item: PhantomData,
    }));
    self
  }

  /// Sets the branch to run when no channel is ready, replacing any earlier one.
  pub fn default_case<F, Fut>(mut self, handler: F) -> Self
  where
    F: FnOnce() -> Fut + Send + 'a,
    Fut: Future<Output = R> + Send + 'a,
  {
    self.default = Some(Box::new(move || -> BoxFuture<'a, R> { Box::pin(handler()) }));
    self
  }

  /// Number of channel branches.
  pub fn len(&self) -> usize {
    self.branches.len()
  }

  /// Returns `true` if no channel branch has been added.
  pub fn is_empty(&self) -> bool {
    self.branches.is_empty()
  }

  /// Returns `true` if a default branch is set.
  pub fn has_default(&self) -> bool {
    self.default.is_some()
  }
}

impl<'a, R: 'a> Default for Select<'a, R> {
  fn default() -> Self {
    Self::new()
  }
}

impl<R> fmt::Debug for Select<'_, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Select")
      .field("branches", &self.branches.len())
      .field("has_default", &self.default.is_some())
      .finish()
  }
}

impl<'a, R: 'a> IntoFuture for Select<'a, R> {
  type Output = R;
  type IntoFuture = SelectFuture<'a, R>;

  fn into_future(self) -> Self::IntoFuture {
    SelectFuture {
      state: State::Arbitrating {
        branches: self.branches,
        default: self.default,
        deferred: false,
      },
    }
  }
}

enum State<'a, R> {
  Arbitrating {
    branches: Vec<Box<dyn Branch<'a, R> + 'a>>,
    default: Option<DefaultHandler<'a, R>>,
    deferred: bool,
  },
  Running(BoxFuture<'a, R>),
  Done,
}

/// The future driving a [`Select`].
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct SelectFuture<'a, R> {
  state: State<'a, R>,
}

impl<R> fmt::Debug for SelectFuture<'_, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match &self.state {
      State::Arbitrating { .. } => "Arbitrating",
      State::Running(_) => "Running",
      State::Done => "Done",
    };
    f.debug_struct("SelectFuture").field("state", &state).finish()
  }
}

impl<'a, R> Future for SelectFuture<'a, R> {
  type Output = R;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<R> {
    let this = self.get_mut();
    loop {
      match &mut this.state {
        State::Arbitrating {
          branches,
          default,
          deferred,
        } => {
          let winner = branches
            .iter_mut()
            .enumerate()
            .find_map(|(index, branch)| match branch.poll_ready(index, cx) {
              Poll::Ready(token) => Some(token),
              Poll::Pending => None,
            });

          if let Some(index) = winner {
            let mut branches = mem::take(branches);
            // Dropping the rest withdraws their probes.
            let chosen = branches.swap_remove(index);
            drop(branches);
            tracing::debug!(branch = index, "select chose a channel branch");
            this.state = State::Running(chosen.fire());
            continue;
          }

          if default.is_none() {
            return Poll::Pending;
          }
          if !*deferred {
            *deferred = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
          }

          match default.take() {
            Some(handler) => {
              tracing::debug!(branches = branches.len(), "select fell through to the default branch");
              this.state = State::Running(handler());
            }
            None => return Poll::Pending,
          }
        }
        State::Running(future) => {
          let output = std::task::ready!(future.as_mut().poll(cx));
          this.state = State::Done;
          return Poll::Ready(output);
        }
        State::Done => panic!("SelectFuture polled after completion"),
      }
    }
  }
}

enum Step<T> {
  Value(T),
  Closed,
  Quiet,
}

/// Waits for one value, then keeps taking values for as long as the channel
/// has one ready, returning the most recent.
///
/// Returns when the channel goes quiet (a select against it falls through to
/// its default) or reports end-of-stream. Returns `None` only if the channel
/// was closed before any value arrived.
pub async fn last<'a, T, S>(channel: &'a S) -> Option<T>
where
  T: Send + 'a,
  S: Selectable<T> + Sync + ?Sized + 'a,
{
  let mut current = channel.pop().await?;
  loop {
    let step = Select::new()
      .recv(channel, |value: Option<T>| async move {
        match value {
          Some(v) => Step::Value(v),
          None => Step::Closed,
        }
      })
      .default_case(|| async { Step::Quiet })
      .await;

    match step {
      Step::Value(v) => current = v,
      Step::Closed | Step::Quiet => return Some(current),
    }
  }
}
