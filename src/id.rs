use std::sync::Mutex;

use ulid::{Generator, Ulid};

/// Identifier attached to a scan for log correlation.
pub type ScanId = Ulid;

/// Thread-safe ULID generator scoped to a single connection.
pub struct ScanIdGenerator {
    inner: Mutex<Generator>,
}

impl ScanIdGenerator {
    /// Create a new generator seeded with the current time.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }

    /// Produce the next [`ScanId`] in a monotonic, time-ordered sequence.
    pub fn generate(&self) -> ScanId {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Overflow inside one millisecond falls back to a fresh random id.
        guard.generate().unwrap_or_else(|_| Ulid::new())
    }
}

impl Default for ScanIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
