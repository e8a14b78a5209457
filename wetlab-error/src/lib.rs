//! # wetlab-error
//!
//! Unified error handling for wetlab, following OpenDAL's error handling practices.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., InsufficientVolume, Overflow)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use wetlab_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::Overflow, "transfer will overflow destination 'pool'")
//!         .with_operation("pipette::transfer")
//!         .with_context("destination", "1003")
//!         .with_context("capacity", "200"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, wetlab_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using wetlab Error
pub type Result<T> = std::result::Result<T, Error>;
