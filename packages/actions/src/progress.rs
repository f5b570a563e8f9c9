use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Thread-safe progress counters shared between a host and a running action
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: AtomicUsize,
    completed: AtomicUsize,
    description: Mutex<Option<String>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_items(&self, count: usize) {
        self.total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn item_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_items(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn completed_items(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn set_description(&self, description: impl Into<String>) {
        *self
            .description
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(description.into());
    }

    pub fn description(&self) -> Option<String> {
        self.description
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
