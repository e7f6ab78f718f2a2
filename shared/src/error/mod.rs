//! Error code registry for key transparency
//!
//! - [`ErrorCode`]: stable numeric codes attached to every report
//! - [`ErrorCategory`]: classification of codes by failure domain
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Protocol inconsistency (server returned contradictory data)
//! - 2xxx: Verification failures (signatures, key list mismatch)
//! - 3xxx: Storage failures (stash commit / purge / audit result)
//! - 4xxx: Scheduler failures (self-audit task)
//! - 5xxx: Crypto provider errors
//! - 6xxx: Transparency log client errors
//!
//! # Example
//!
//! ```
//! use shared::error::{ErrorCategory, ErrorCode};
//!
//! let code = ErrorCode::MissingExpectedMinEpoch;
//! assert_eq!(code.category(), ErrorCategory::ProtocolInconsistency);
//! assert_eq!(u16::from(code), 1001);
//! ```

mod category;
mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
