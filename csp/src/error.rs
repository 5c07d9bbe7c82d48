// src/error.rs

use core::fmt;

/// Largest duration, in milliseconds, accepted by the timer helpers.
pub const MAX_DELAY_MILLIS: i64 = i32::MAX as i64;

// Implements `into_inner`, `Display` and `Error` for enums whose every variant
// carries the rejected value.
macro_rules! impl_error_for_enum_with_inner {
    (
        $enum_name:ident < $generic_param:ident >,
        $($variant:ident ( $message:expr ) ),+
        $(,)?
    ) => {
        impl<$generic_param> $enum_name<$generic_param> {
            /// Consumes the error, returning the value that could not be delivered.
            #[inline]
            pub fn into_inner(self) -> $generic_param {
                match self {
                    $( $enum_name::$variant(v) => v, )+
                }
            }
        }

        impl<$generic_param> fmt::Display for $enum_name<$generic_param> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $( $enum_name::$variant(_) => f.write_str($message), )+
                }
            }
        }

        impl<$generic_param> std::error::Error for $enum_name<$generic_param> {}
    };
}

/// Error returned by `put` when the value could not be handed to a consumer.
///
/// The value is always given back, a put is never silently dropped.
#[derive(PartialEq, Eq, Clone)]
pub enum SendError<T> {
  /// The channel was already closed when the put was attempted. Nothing was queued.
  Closed(T),
  /// The put was queued, waiting for a consumer, when the channel was closed.
  ClosedWhilePending(T),
}

impl<T> SendError<T> {
  /// Returns `true` if the put was rejected before it was ever queued.
  #[inline]
  pub fn is_closed(&self) -> bool {
    matches!(self, SendError::Closed(_))
  }

  /// Returns `true` if the put was waiting for a consumer when the channel closed.
  #[inline]
  pub fn is_closed_while_pending(&self) -> bool {
    matches!(self, SendError::ClosedWhilePending(_))
  }
}

impl<T> fmt::Debug for SendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SendError::Closed(_) => write!(f, "SendError::Closed(..)"),
      SendError::ClosedWhilePending(_) => write!(f, "SendError::ClosedWhilePending(..)"),
    }
  }
}

impl_error_for_enum_with_inner!(
  SendError<T>,
  Closed("can not put to a closed channel"),
  ClosedWhilePending("channel closed before the value was taken"),
);

/// Error returned when attempting to close an already closed channel.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CloseError;
impl std::error::Error for CloseError {}
impl fmt::Display for CloseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "can not close a channel twice")
  }
}

/// Error returned by the timer helpers for a negative duration or one that does
/// not fit a signed 32-bit millisecond count.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RangeError {
  /// The rejected duration, in milliseconds.
  pub millis: i64,
}

impl RangeError {
  /// Validates `millis` against `0..=MAX_DELAY_MILLIS`.
  pub fn check(millis: i64) -> Result<u64, RangeError> {
    if (0..=MAX_DELAY_MILLIS).contains(&millis) {
      Ok(millis as u64)
    } else {
      Err(RangeError { millis })
    }
  }
}

impl std::error::Error for RangeError {}
impl fmt::Display for RangeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} is out of signed int32 bound or is negative", self.millis)
  }
}
