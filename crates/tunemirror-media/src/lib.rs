//! Media access for tunemirror
//!
//! Everything that touches audio files goes through this crate:
//!
//! - [`MediaDescriptor`]: a file path plus lazily probed, cached media properties
//! - [`SoxProbe`] / [`SoxTranscoder`]: the `sox` command-line backends
//! - [`FileCopier`]: plain copies with timestamp preservation
//! - [`StagingFile`]: write-then-rename so final names never hold partial output
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tunemirror_media::{MediaDescriptor, SoxProbe};
//!
//! # fn main() -> tunemirror_types::Result<()> {
//! let probe = Arc::new(SoxProbe::default());
//! let file = MediaDescriptor::open("/music/album/track.flac", probe)?;
//! if file.is_lossless() {
//!     println!("{} kbps", file.bitrate_kbps());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod copier;
pub mod descriptor;
pub mod sox;
pub mod staging;

pub use copier::FileCopier;
pub use descriptor::{extension_of, MediaDescriptor};
pub use sox::{parse_bitrate_kbps, SoxProbe, SoxTranscoder, DEFAULT_SOX};
pub use staging::{is_staging_name, StagingFile, STAGING_PREFIX};
