//! Mediadex-Common: Shared types, contracts, and utilities.
//!
//! This crate provides common functionality used across mediadex:
//!
//! - **Core Types**: Enums for media types, scripts, tag operators, and
//!   lifecycle states
//! - **Error Handling**: Common error type and result alias
//! - **System Definitions**: The lookup contract from system ids to media
//!   types
//! - **Cancellation**: A condvar-backed token for cooperative shutdown
//!
//! # Examples
//!
//! ```
//! use mediadex_common::{Error, MediaType, Result, TagFilter, TagOp};
//!
//! let filter = TagFilter::with_op("region", "usa", TagOp::And);
//! assert_eq!(filter.op, TagOp::And);
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("media 42"))
//! }
//! assert!(example().is_err());
//! ```

pub mod cancel;
pub mod error;
pub mod systems;
pub mod types;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use systems::{MapSystemDefs, SystemDefs};
pub use types::*;
