//! Execution context handles.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one isolation boundary: a request, a task or a worker thread.
///
/// Every unit of work runs within exactly one execution context and all
/// transactional state is partitioned by it, so two contexts never observe
/// each other's transactions. The handle is cheap to clone; clones refer to
/// the same context. Passing the context explicitly (instead of relying on
/// thread identity) keeps the partitioning correct when a single thread
/// hosts many logical contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    id: u64,
}

impl ExecutionContext {
    /// Open a fresh context with a process-unique identity.
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The unique identifier of this context.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
