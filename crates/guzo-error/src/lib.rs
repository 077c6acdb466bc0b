//! Contextual error type used across the Guzo workspace.
//!
//! [`Error<C>`] carries three things: the [`ErrorCategory`] that
//! decides how the failure is presented to API consumers, a chain of
//! context frames with their capture locations, and the [`tracing`]
//! span that was current when the error was created. The typed `C`
//! parameter lets fallible functions advertise their most recent
//! context (`Result<T, Error<InsertBookingError>>`) while `Result<T>`
//! erases it.
//!
//! [`ErrorCategory`]: guzo_api_types::ErrorCategory
mod error;
mod fmt;
mod internal;

pub mod ext;

pub use self::error::{Context, Error};
pub use self::internal::NoContext;
pub use guzo_api_types::{Error as ApiError, ErrorCategory as ApiErrorCategory};

pub type Result<T, C = NoContext> = std::result::Result<T, Error<C>>;
