// src/sink.rs
//! Injected observability collaborator. Components receive a sink at
//! construction instead of reaching for process-wide state, so units can be
//! tested in isolation with a capturing sink. Nothing in the pipeline depends
//! on a sink call succeeding.

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLevel {
    Info,
    Warning,
    Error,
}

/// Leveled text events emitted by the pipeline.
pub trait EventSink: Send + Sync {
    fn emit(&self, level: SinkLevel, message: &str);

    /// Per-article completion record.
    fn article_processed(&self, title: &str, score: u8, confidence: f64) {
        self.emit(
            SinkLevel::Info,
            &format!("processed article (score {score}, confidence {confidence}): {title}"),
        );
    }
}

/// Shared handle used by the processor and aggregator.
pub type SharedSink = Arc<dyn EventSink>;

/// Default sink: forwards to the `tracing` subscriber.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, level: SinkLevel, message: &str) {
        match level {
            SinkLevel::Info => info!("{message}"),
            SinkLevel::Warning => warn!("{message}"),
            SinkLevel::Error => error!("{message}"),
        }
    }
}

pub fn tracing_sink() -> SharedSink {
    Arc::new(TracingSink)
}

/// Capturing sink for tests.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<(SinkLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(SinkLevel, String)> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn count(&self, level: SinkLevel) -> usize {
        self.events()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, level: SinkLevel, message: &str) {
        if let Ok(mut g) = self.events.lock() {
            g.push((level, message.to_string()));
        }
    }
}
