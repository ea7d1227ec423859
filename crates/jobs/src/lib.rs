//! Orchestration over the per-block check pipeline: bulk jobs with a
//! bounded worker pool, and the background liveness loop over the
//! free-cookie pool. Both talk to the rest of the system only through the
//! store and the checker/minter seams.

pub mod orchestrator;
pub mod refresh;

pub use orchestrator::Orchestrator;
pub use refresh::{RefreshLoop, RefreshSummary};
