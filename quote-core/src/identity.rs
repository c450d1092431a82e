use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::models::EntryId;

/// Source of fresh line item identities.
///
/// Every call must return an id that has never been handed out before.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> EntryId;
}

/// Random v4 UUIDs, rendered as hyphenated lowercase strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> EntryId {
        EntryId::new(Uuid::new_v4().to_string())
    }
}

/// Deterministic ids of the form `{prefix}-1`, `{prefix}-2`, ...
///
/// Useful wherever reproducible output matters, such as tests and fixtures.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> EntryId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        EntryId::new(format!("{}-{}", self.prefix, n))
    }
}
