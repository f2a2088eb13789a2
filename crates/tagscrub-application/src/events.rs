// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Pipeline progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Pass label: `"1"`, `"2a"`, `"2b"` or `"3"`.
    pub pass: &'static str,
    /// One-based position within the pass.
    pub index: usize,
    pub total: usize,
    pub message: String,
}

/// Progress sink abstraction
pub trait ProgressSink: Send {
    fn report(&mut self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent) + Send,
{
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _event: ProgressEvent) {}
}

/// A minimal in-memory sink that keeps every event, shareable across threads.
#[derive(Clone, Default)]
pub struct RecordingProgress {
    inner: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve and clear all captured events
    pub fn drain(&self) -> Vec<ProgressEvent> {
        match self.inner.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&mut self, event: ProgressEvent) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.push(event);
        }
    }
}
