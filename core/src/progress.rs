use crate::metrics::Phase;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub current: u64,
    pub total: u64,
}

impl ProgressEvent {
    pub fn new(phase: Phase, current: u64, total: u64) -> Self {
        Self {
            phase,
            current,
            total,
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.current as f64 * 100.0 / self.total as f64
        }
    }
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("progress sink lock poisoned")]
    LockPoisoned,
}

/// Receives progress after every entity or class processed. Advisory only:
/// the migration never fails because a sink cannot keep up.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
pub struct InMemoryProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl InMemoryProgressSink {
    pub fn events(&self) -> Result<Vec<ProgressEvent>, ProgressError> {
        let events = self.events.lock().map_err(|_| ProgressError::LockPoisoned)?;
        Ok(events.clone())
    }
}

impl ProgressSink for InMemoryProgressSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Forwards events to an external subscriber (status poller, progress bar).
pub struct ChannelProgressSink {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver just means nobody is watching.
        let _ = self.sender.send(event);
    }
}

/// Logs one line every `interval` events and at the end of each phase.
pub struct LoggingProgressSink {
    interval: u64,
}

impl LoggingProgressSink {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }
}

impl ProgressSink for LoggingProgressSink {
    fn emit(&self, event: ProgressEvent) {
        if event.current % self.interval == 0 || event.current == event.total {
            info!(
                "  {} {}/{} ({:.1}%)",
                event.phase,
                event.current,
                event.total,
                event.percent()
            );
        }
    }
}
