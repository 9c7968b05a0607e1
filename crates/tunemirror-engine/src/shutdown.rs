//! Two-stage cancellation
//!
//! The first trigger asks running work to finish and queued work to be dropped; the
//! second aborts running work as well.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// How far shutdown has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ShutdownLevel {
    /// No shutdown requested
    #[default]
    Running,
    /// Finish in-flight tasks, start no new ones
    Stop,
    /// Abort in-flight tasks
    Kill,
}

/// Cloneable handle that escalates shutdown
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    level: Arc<watch::Sender<ShutdownLevel>>,
}

impl ShutdownSignal {
    /// New signal at [`ShutdownLevel::Running`]
    pub fn new() -> Self {
        let (level, _) = watch::channel(ShutdownLevel::Running);
        Self {
            level: Arc::new(level),
        }
    }

    /// Escalate one level and return the new level
    pub fn trigger(&self) -> ShutdownLevel {
        let mut reached = ShutdownLevel::Running;
        self.level.send_modify(|level| {
            *level = match *level {
                ShutdownLevel::Running => ShutdownLevel::Stop,
                ShutdownLevel::Stop | ShutdownLevel::Kill => ShutdownLevel::Kill,
            };
            reached = *level;
        });

        match reached {
            ShutdownLevel::Stop => {
                info!("Stopping after running jobs finish; interrupt again to abort them");
            }
            ShutdownLevel::Kill => warn!("Aborting running jobs"),
            ShutdownLevel::Running => {}
        }
        reached
    }

    /// Raise the level to at least `Stop`
    pub fn stop(&self) {
        self.raise(ShutdownLevel::Stop);
    }

    /// Raise the level to `Kill`
    pub fn kill(&self) {
        self.raise(ShutdownLevel::Kill);
    }

    /// Current level
    pub fn level(&self) -> ShutdownLevel {
        *self.level.borrow()
    }

    /// Whether any shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.level() > ShutdownLevel::Running
    }

    /// Receiver notified on every escalation
    pub fn subscribe(&self) -> watch::Receiver<ShutdownLevel> {
        self.level.subscribe()
    }

    fn raise(&self, target: ShutdownLevel) {
        self.level.send_if_modified(|level| {
            if *level < target {
                *level = target;
                true
            } else {
                false
            }
        });
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
