//! Result type alias for tunemirror operations

use crate::Error;

/// Result type alias for tunemirror operations
pub type Result<T> = std::result::Result<T, Error>;
