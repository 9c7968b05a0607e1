//! Library mirroring for tunemirror
//!
//! A run has three phases:
//!
//! 1. [`SyncPlanner`] walks the source (or reads a playlist / cue sheet) and resolves
//!    the rule book for every file into a [`Plan`] of copy, encode and skip jobs.
//! 2. [`SyncEngine`] runs the jobs on two worker pools, one copier and `threads` encoders.
//! 3. [`Janitor`] deletes target files no source produced and prunes empty directories.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tunemirror_media::{SoxProbe, SoxTranscoder};
//! use tunemirror_rules::{EncodeAction, RuleBook, Selector};
//! use tunemirror_sync::{SyncEngine, SyncOptions, SyncRequest};
//!
//! # async fn example() -> tunemirror_types::Result<()> {
//! let mut rules = RuleBook::new();
//! rules.encode(Selector::lossless(), EncodeAction::convert_to("ogg"))?;
//!
//! let engine = SyncEngine::new(
//!     rules,
//!     Arc::new(SoxProbe::default()),
//!     Arc::new(SoxTranscoder::default()),
//!     SyncOptions::default(),
//! );
//! let report = engine.sync(SyncRequest::new("/music", "/mnt/player")).await?;
//! println!("{} files written", report.stats.files_written());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod janitor;
pub mod manifest;
pub mod planner;

#[cfg(test)]
mod testing;

pub use engine::{FileError, SyncEngine, SyncOptions, SyncReport, SyncRequest};
pub use janitor::{CleanupReport, Janitor};
pub use manifest::{normalize_lexically, parse_entries, Manifest};
pub use planner::{display_relative, Plan, PlanError, SyncPlanner};
