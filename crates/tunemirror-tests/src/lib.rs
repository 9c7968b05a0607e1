//! tunemirror integration test support
//!
//! Fixtures and collaborator fakes shared by the integration tests: a source/target
//! library pair on a temporary directory, a prober keyed by file extension and
//! transcoders that record, fail or block on demand.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
pub mod test_utils;
