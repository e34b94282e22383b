//! # graphgen-error
//!
//! Unified error handling for graphgen, in the style of OpenDAL's errors.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., ClassificationFailed, EvaluationFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use graphgen_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::EvaluationFailed, "division by zero")
//!         .with_operation("evaluator::evaluate")
//!         .with_context("equation", "1/x")
//!         .with_context("x", "0"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, graphgen_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Users see `Error::user_message()`, logs get the full `Display`

mod error;
mod kind;
mod status;

pub use error::{Error, TRY_AGAIN};
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using graphgen Error
pub type Result<T> = std::result::Result<T, Error>;
