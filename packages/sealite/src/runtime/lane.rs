use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One member of the pool's execution group.
///
/// A lane is only an index: the registry keeps one connection pool per lane,
/// so operations bound to different lanes never share a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionLane(usize);

impl ExecutionLane {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ExecutionLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane-{}", self.0)
    }
}

/// Round-robin lane selector
#[derive(Debug)]
pub(crate) struct LaneCursor {
    lanes: usize,
    next: AtomicUsize,
}

impl LaneCursor {
    pub(crate) fn new(lanes: usize) -> Self {
        Self {
            lanes: lanes.max(1),
            next: AtomicUsize::new(0),
        }
    }

    pub(crate) fn lanes(&self) -> usize {
        self.lanes
    }

    pub(crate) fn next(&self) -> ExecutionLane {
        ExecutionLane(self.next.fetch_add(1, Ordering::Relaxed) % self.lanes)
    }
}
