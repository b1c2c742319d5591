//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: requests sent to the scheduler actor via mpsc, queries
//!    answer through a oneshot channel
//! 2. **Events**: [`EngineEvent`]s broadcast to every subscriber
//!
//! Check results and external command lines are buffered by the actor and
//! applied on its next cycle, in arrival order.

use tokio::sync::oneshot;

use crate::check::CheckResult;
use crate::config::Config;
use crate::error::InvalidConfig;
use crate::scheduler::{CycleReport, ItemState};
use crate::snapshot::{Snapshot, SnapshotKind};
use crate::stats::SchedulerStats;

pub use crate::scheduler::EngineEvent;

/// Commands that can be sent to the SchedulerActor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Result of a launched check, applied on the next cycle
    SubmitResult(CheckResult),

    /// Raw external command line, applied at the end of the next cycle
    ExternalCommand(String),

    /// Run a cycle now (bypassing the interval timer)
    ///
    /// Used for testing and manual refresh operations.
    RunCycle {
        respond_to: oneshot::Sender<CycleReport>,
    },

    GetState {
        name: String,
        respond_to: oneshot::Sender<Option<ItemState>>,
    },

    IsLinkedWith {
        source: String,
        target: String,
        respond_to: oneshot::Sender<bool>,
    },

    Snapshot {
        name: String,
        kind: SnapshotKind,
        respond_to: oneshot::Sender<Option<Snapshot>>,
    },

    GetStats {
        respond_to: oneshot::Sender<SchedulerStats>,
    },

    /// Swap in a new configuration
    ///
    /// An invalid configuration is refused and the running one kept.
    Reload {
        config: Box<Config>,
        respond_to: oneshot::Sender<Result<(), InvalidConfig>>,
    },

    /// Gracefully shut down the scheduler
    Shutdown,
}
