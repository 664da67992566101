//! In-process invocation log backed by a ring of records behind a `RwLock`.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{PoisonError, RwLock};

use crate::record::InvocationRecord;
use crate::traits::InvocationStore;

/// Append-only, insertion-ordered invocation log held in memory.
///
/// Unbounded unless constructed with [`with_capacity_cap`](Self::with_capacity_cap),
/// in which case the oldest record is evicted once the cap is reached.
#[derive(Debug, Default)]
pub struct InMemoryInvocationLog {
    records: RwLock<VecDeque<InvocationRecord>>,
    cap: Option<NonZeroUsize>,
}

impl InMemoryInvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that retains at most `cap` records.
    pub fn with_capacity_cap(cap: NonZeroUsize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(cap.get().min(1024))),
            cap: Some(cap),
        }
    }

    pub fn capacity_cap(&self) -> Option<NonZeroUsize> {
        self.cap
    }
}

impl InvocationStore for InMemoryInvocationLog {
    fn append(&self, record: InvocationRecord) {
        // A poisoned lock still holds only whole records: pushes never panic midway.
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(cap) = self.cap {
            while records.len() >= cap.get() {
                records.pop_front();
            }
        }
        records.push_back(record);
    }

    fn list(&self, function_arn: Option<&str>) -> Vec<InvocationRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        match function_arn {
            Some(arn) => records
                .iter()
                .filter(|r| r.function_arn == arn)
                .cloned()
                .collect(),
            None => records.iter().cloned().collect(),
        }
    }

    fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
