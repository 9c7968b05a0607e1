//! Validated configuration values
//!
//! Newtypes that cannot hold an out-of-range value once constructed.

use std::time::Duration;

/// Worker count for the transcode pool with validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThreadCount(usize);

impl ThreadCount {
    /// Minimum thread count
    pub const MIN: usize = 1;
    /// Maximum thread count
    pub const MAX: usize = 256;

    /// Create a new thread count with validation
    pub fn new(count: usize) -> Result<Self, String> {
        if count < Self::MIN {
            Err(format!("Thread count {} is below minimum {}", count, Self::MIN))
        } else if count > Self::MAX {
            Err(format!("Thread count {} exceeds maximum {}", count, Self::MAX))
        } else {
            Ok(Self(count))
        }
    }

    /// Get the thread count value
    pub fn get(self) -> usize {
        self.0
    }

    /// One encoder per available core
    pub fn optimal() -> Self {
        Self(num_cpus::get().clamp(Self::MIN, Self::MAX))
    }
}

impl Default for ThreadCount {
    fn default() -> Self {
        Self::optimal()
    }
}

/// Upper bound on ` (n)` candidates tried when renaming a colliding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenameLimit(u32);

impl RenameLimit {
    /// Default number of attempts
    pub const DEFAULT: u32 = 1000;

    /// Create a new limit, rejecting zero
    pub fn new(attempts: u32) -> Result<Self, String> {
        if attempts == 0 {
            Err("Rename attempt limit must be at least 1".to_string())
        } else {
            Ok(Self(attempts))
        }
    }

    /// Get the limit value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for RenameLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Coordinator wake-up interval for worker pools
pub const DEFAULT_POOL_TICK: Duration = Duration::from_millis(250);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(8, true)]
    #[case(256, true)]
    #[case(257, false)]
    fn test_thread_count_bounds(#[case] count: usize, #[case] valid: bool) {
        assert_eq!(ThreadCount::new(count).is_ok(), valid);
    }

    #[test]
    fn test_optimal_thread_count_in_range() {
        let threads = ThreadCount::optimal().get();
        assert!(threads >= ThreadCount::MIN);
        assert!(threads <= ThreadCount::MAX);
    }

    #[test]
    fn test_rename_limit() {
        assert_eq!(RenameLimit::default().get(), 1000);
        assert!(RenameLimit::new(0).is_err());
        assert_eq!(RenameLimit::new(3).unwrap().get(), 3);
    }
}
