//! Built-in observers: latest-fix display state, the JSONL track log, and
//! the broadcast channel remote consumers subscribe to.
//!
//! Each sink owns and locks its own state; the dispatch path never shares
//! mutable state between sinks.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::info;

use crate::fix::Fix;
use crate::observer::FixObserver;

/// Most recent fix per source, for a live display to read.
#[derive(Default)]
pub struct LatestFixTracker {
    latest: DashMap<String, Fix>,
}

impl LatestFixTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, source_id: &str) -> Option<Fix> {
        self.latest.get(source_id).map(|entry| entry.value().clone())
    }

    /// Current fix for every source that has reported one.
    pub fn snapshot(&self) -> Vec<Fix> {
        self.latest.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl FixObserver for LatestFixTracker {
    fn name(&self) -> &'static str {
        "latest-fix"
    }

    fn on_fix(&self, fix: &Fix) -> Result<()> {
        self.latest.insert(fix.source_id.clone(), fix.clone());
        Ok(())
    }
}

/// Append-only JSONL track log of serialized fixes.
pub struct TrackLogWriter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl TrackLogWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open track log {path:?}"))?;
        info!("Track log open at {:?}", path);

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FixObserver for TrackLogWriter {
    fn name(&self) -> &'static str {
        "track-log"
    }

    fn on_fix(&self, fix: &Fix) -> Result<()> {
        let line = fix.to_wire_json()?;
        let mut writer = self.writer.lock().expect("track log lock poisoned");
        writeln!(writer, "{line}").context("track log write failed")?;
        // One fix per line on disk, even if the process dies mid-flight.
        writer.flush().context("track log flush failed")?;
        Ok(())
    }
}

/// Fan-out of serialized fixes to any number of subscribers.
///
/// Subscribers that fall behind lose the oldest payloads per broadcast
/// channel semantics; delivery to an absent or unreachable subscriber is
/// not guaranteed.
pub struct FixBroadcaster {
    tx: broadcast::Sender<String>,
}

impl FixBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl FixObserver for FixBroadcaster {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn on_fix(&self, fix: &Fix) -> Result<()> {
        let payload = fix.to_wire_json()?;
        // A send with zero subscribers is not a fault.
        let _ = self.tx.send(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::RawLine;
    use crate::parser;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    fn fix_from(source: &str, text: &str) -> Fix {
        parser::parse(&RawLine::new(source, text))
    }

    #[test]
    fn tracker_keeps_latest_fix_per_source() {
        let tracker = LatestFixTracker::new();
        tracker.on_fix(&fix_from("alpha", GGA)).unwrap();
        tracker.on_fix(&fix_from("bravo", GGA)).unwrap();
        tracker.on_fix(&fix_from("alpha", RMC)).unwrap();

        assert_eq!(tracker.snapshot().len(), 2);
        assert_eq!(tracker.latest("alpha").unwrap().sentence_type, "GPRMC");
        assert_eq!(tracker.latest("bravo").unwrap().sentence_type, "GPGGA");
        assert!(tracker.latest("charlie").is_none());
    }

    #[test]
    fn track_log_appends_one_wire_line_per_fix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voyage.jsonl");

        let log = TrackLogWriter::create(&path).unwrap();
        log.on_fix(&fix_from("alpha", GGA)).unwrap();
        log.on_fix(&fix_from("alpha", RMC)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "GPGGA");
        assert_eq!(first["sats"], 8);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["type"], "GPRMC");
        assert!((second["speed"].as_f64().unwrap() - 22.4).abs() < 0.1);
    }

    #[tokio::test]
    async fn broadcaster_delivers_to_every_subscriber() {
        let broadcaster = FixBroadcaster::new(16);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.on_fix(&fix_from("alpha", GGA)).unwrap();

        let payload: serde_json::Value =
            serde_json::from_str(&first.recv().await.unwrap()).unwrap();
        assert_eq!(payload["type"], "GPGGA");
        assert_eq!(payload["isValid"], true);

        assert!(second.recv().await.is_ok());
    }

    #[test]
    fn broadcaster_tolerates_zero_subscribers() {
        let broadcaster = FixBroadcaster::new(16);
        assert!(broadcaster.on_fix(&fix_from("alpha", GGA)).is_ok());
    }
}
