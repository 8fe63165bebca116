//! # lokql-error
//!
//! Unified error handling for lokql.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., BackendUnavailable, QueryRejected)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use lokql_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::QueryRejected, "parse error at line 1")
//!         .with_operation("loki::query")
//!         .with_context("status", "400")
//!         .with_context("logql", "{job=\"nginx\"}"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, lokql_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using lokql Error
pub type Result<T> = std::result::Result<T, Error>;
