//! Session recording sinks.
//!
//! Finished sessions are fanned out to sinks fire-and-forget: a sink that
//! fails (or a dropped channel receiver) is logged and skipped, and the
//! caller's response is never delayed or altered by recording.

use std::io::{self, Result as IoResult};
use std::sync::{Arc, Mutex};

use crate::generation::GenerationSession;

/// An output target that consumes finished sessions.
pub trait SessionSink: Send + Sync {
    fn record(&self, session: &GenerationSession) -> IoResult<()>;
}

/// Emits one structured tracing event per session.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl SessionSink for TracingSink {
    fn record(&self, session: &GenerationSession) -> IoResult<()> {
        tracing::info!(
            session_id = %session.id,
            status = ?session.status,
            attempts = session.attempts.len(),
            score = session.final_report.as_ref().map(|r| r.quality_score),
            "generation session recorded"
        );
        Ok(())
    }
}

/// In-memory sink for testing and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<GenerationSession>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured sessions.
    pub fn snapshot(&self) -> Vec<GenerationSession> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drop all captured sessions.
    pub fn clear(&self) {
        match self.entries.lock() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl SessionSink for MemorySink {
    fn record(&self, session: &GenerationSession) -> IoResult<()> {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(session.clone()),
            Err(poisoned) => poisoned.into_inner().push(session.clone()),
        }
        Ok(())
    }
}

/// Forwards sessions to a flume channel for async consumers (dashboards,
/// live tails). Never blocks; a dropped receiver reports as a broken pipe.
pub struct ChannelSink {
    tx: flume::Sender<GenerationSession>,
}

impl ChannelSink {
    pub fn new(tx: flume::Sender<GenerationSession>) -> Self {
        Self { tx }
    }
}

impl SessionSink for ChannelSink {
    fn record(&self, session: &GenerationSession) -> IoResult<()> {
        self.tx
            .try_send(session.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "session receiver dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_captures_and_clears() {
        let sink = MemorySink::new();
        sink.record(&GenerationSession::new("demo")).unwrap();
        sink.record(&GenerationSession::new("demo two")).unwrap();
        assert_eq!(sink.snapshot().len(), 2);
        sink.clear();
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn channel_sink_reports_dropped_receiver() {
        let (tx, rx) = flume::unbounded();
        let sink = ChannelSink::new(tx);
        sink.record(&GenerationSession::new("demo")).unwrap();
        assert_eq!(rx.recv().unwrap().description, "demo");

        drop(rx);
        assert!(sink.record(&GenerationSession::new("demo")).is_err());
    }
}
