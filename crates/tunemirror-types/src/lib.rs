//! Core type system and error handling for tunemirror
//!
//! This crate provides the foundational types shared by every tunemirror crate:
//!
//! - **Error handling**: one error enum with severity levels and recoverability
//! - **Core types**: media kinds, planned jobs, run statistics
//! - **Traits**: the prober and transcoder seams the engine is written against
//! - **Configuration**: validated value types
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `async`: Enable the async [`Transcoder`] trait
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use tunemirror_types::{MediaKind, Result, SyncStats};
//!
//! fn example_run() -> Result<SyncStats> {
//!     let kind = MediaKind::audio("flac");
//!     assert!(kind.is_lossless());
//!
//!     let mut stats = SyncStats::new();
//!     stats.files_checked = 2;
//!     stats.files_copied = 1;
//!     Ok(stats)
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{RenameLimit, ThreadCount, DEFAULT_POOL_TICK};
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use traits::*;
pub use types::*;
