//! Capability traits for code that should accept "anything you can pop from"
//! or "anything you can put into" rather than a concrete [`Channel`].
//!
//! The methods return boxed futures so the traits stay object safe, and
//! [`Select`](crate::Select) accepts any `Selectable<T>`, trait objects included.
//! `Channel`'s inherent methods return unboxed futures and take precedence
//! when calling through a concrete channel.

use crate::channel::Channel;
use crate::error::{CloseError, SendError};

use futures_util::future::BoxFuture;

/// The operations shared by both ends of a channel.
pub trait Closable {
  /// Closes the channel. Closing twice is an error.
  fn close(&self) -> Result<(), CloseError>;
  /// Returns `true` once the channel has been closed.
  fn is_closed(&self) -> bool;
}

/// A channel that values can be received from.
pub trait Pop<T>: Closable {
  /// Takes the next value, or `None` once the channel is closed.
  fn pop(&self) -> BoxFuture<'_, Option<T>>;
}

/// A channel that values can be sent to.
pub trait Put<T>: Closable {
  /// Offers `value`, completing once a consumer has taken it.
  fn put(&self, value: T) -> BoxFuture<'_, Result<(), SendError<T>>>;
}

/// A channel that can both send and receive.
pub trait Chan<T>: Pop<T> + Put<T> {}

impl<T, C: Pop<T> + Put<T> + ?Sized> Chan<T> for C {}

/// A channel that can take part in a [`Select`](crate::Select).
pub trait Selectable<T>: Pop<T> {
  /// Resolves to `token` once a pop would complete immediately, without
  /// consuming anything.
  fn ready(&self, token: usize) -> BoxFuture<'_, usize>;
}

impl<T: Send> Closable for Channel<T> {
  fn close(&self) -> Result<(), CloseError> {
    Channel::close(self)
  }

  fn is_closed(&self) -> bool {
    Channel::is_closed(self)
  }
}

impl<T: Send> Pop<T> for Channel<T> {
  fn pop(&self) -> BoxFuture<'_, Option<T>> {
    Box::pin(Channel::pop(self))
  }
}

impl<T: Send> Put<T> for Channel<T> {
  fn put(&self, value: T) -> BoxFuture<'_, Result<(), SendError<T>>> {
    Box::pin(Channel::put(self, value))
  }
}

impl<T: Send> Selectable<T> for Channel<T> {
  fn ready(&self, token: usize) -> BoxFuture<'_, usize> {
    Box::pin(Channel::ready(self, token))
  }
}
