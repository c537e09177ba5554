//! Exit code constants for CLI commands
//!
//! - 0: Success
//! - 1: The request was rejected (validation, missing note, note limit)
//! - 2: The store could not be opened or used

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Request rejected by the store
pub const EXIT_WARNING: i32 = 1;

/// Storage, configuration or I/O failure
pub const EXIT_ERROR: i32 = 2;
