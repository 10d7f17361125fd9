//! Worker runtime, execution lanes and admission control.

pub mod counters;
mod lane;
mod pool;

pub use counters::{PoolCounters, Snapshot};
pub use lane::ExecutionLane;
pub use pool::{ResourcePool, ERR_UNCLEAN_SHUTDOWN};
