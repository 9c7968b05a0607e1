//! Task execution for tunemirror
//!
//! This crate provides the concurrency primitives the sync engine runs jobs on:
//!
//! - **WorkerPool**: FIFO queue with a bounded number of concurrently running tasks,
//!   graceful `stop` and hard `kill`
//! - **ShutdownSignal**: a shared, escalating stop/kill request
//!
//! # Examples
//!
//! ```rust
//! use tunemirror_engine::WorkerPool;
//!
//! # async fn example() -> tunemirror_types::Result<()> {
//! let pool = WorkerPool::new("encode", 4);
//! for track in ["a.flac", "b.flac"] {
//!     pool.submit(async move {
//!         println!("encoding {}", track);
//!         Ok(())
//!     })?;
//! }
//! pool.join().await;
//! assert_eq!(pool.completed(), 2);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod pool;
pub mod shutdown;

pub use pool::WorkerPool;
pub use shutdown::{ShutdownLevel, ShutdownSignal};
