// End-to-end test: replay a recorded sentence file through the full
// pipeline and verify what reaches the observers.

use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tempfile::NamedTempFile;

use pelorus::sinks::{FixBroadcaster, LatestFixTracker};
use pelorus::{FileReplaySource, Fix, FixObserver, FixQuality, Pipeline};

const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
const GGA_BAD_CHECKSUM: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00";

struct Collector {
    fixes: Mutex<Vec<Fix>>,
}

impl Collector {
    fn new() -> Self {
        Self {
            fixes: Mutex::new(Vec::new()),
        }
    }

    fn collected(&self) -> Vec<Fix> {
        self.fixes.lock().unwrap().clone()
    }
}

impl FixObserver for Collector {
    fn name(&self) -> &'static str {
        "collector"
    }

    fn on_fix(&self, fix: &Fix) -> Result<()> {
        self.fixes.lock().unwrap().push(fix.clone());
        Ok(())
    }
}

struct FlakySink;

impl FixObserver for FlakySink {
    fn name(&self) -> &'static str {
        "flaky-sink"
    }

    fn on_fix(&self, _fix: &Fix) -> Result<()> {
        anyhow::bail!("connection refused")
    }
}

fn recording(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// Wrap a payload in the `$...*hh` frame with its computed checksum.
fn framed(payload: &str) -> String {
    let checksum = payload.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("${payload}*{checksum:02X}")
}

#[tokio::test]
async fn replay_delivers_decoded_fixes_in_arrival_order() {
    let file = recording(&[GGA, GGA_BAD_CHECKSUM, RMC]);

    let collector = Arc::new(Collector::new());
    let pipeline = Pipeline::new()
        .with_source("voyage", Box::new(FileReplaySource::new(file.path())))
        .with_observer(collector.clone());

    pipeline.run().await.unwrap();

    // The tampered sentence is discarded before fan-out.
    let fixes = collector.collected();
    assert_eq!(fixes.len(), 2);

    let gga = &fixes[0];
    assert_eq!(gga.sentence_type, "GPGGA");
    assert_eq!(gga.source_id, "voyage");
    assert!(gga.is_valid);
    assert_eq!(gga.satellite_count, 8);
    assert!((gga.latitude - 48.1173).abs() < 1e-4);
    assert!((gga.longitude - 11.5167).abs() < 1e-4);
    assert!((gga.altitude_meters - 545.4).abs() < 1e-9);

    let rmc = &fixes[1];
    assert_eq!(rmc.sentence_type, "GPRMC");
    assert!((rmc.speed_knots - 22.4).abs() < 0.1);
    assert!((rmc.course_degrees - 84.4).abs() < 0.1);
}

#[tokio::test]
async fn void_course_sentence_is_delivered_with_no_quality() {
    let void_rmc = framed("GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W");
    let file = recording(&[&void_rmc]);

    let collector = Arc::new(Collector::new());
    let pipeline = Pipeline::new()
        .with_source("voyage", Box::new(FileReplaySource::new(file.path())))
        .with_observer(collector.clone());

    pipeline.run().await.unwrap();

    let fixes = collector.collected();
    assert_eq!(fixes.len(), 1);
    assert!(fixes[0].is_valid);
    assert_eq!(fixes[0].fix_quality, FixQuality::None);
}

#[tokio::test]
async fn failing_sink_does_not_starve_the_sinks_after_it() {
    let file = recording(&[GGA, RMC]);

    let collector = Arc::new(Collector::new());
    let tracker = Arc::new(LatestFixTracker::new());
    let pipeline = Pipeline::new()
        .with_source("voyage", Box::new(FileReplaySource::new(file.path())))
        .with_observer(Arc::new(FlakySink))
        .with_observer(collector.clone())
        .with_observer(tracker.clone());

    pipeline.run().await.unwrap();

    assert_eq!(collector.collected().len(), 2);
    assert_eq!(tracker.latest("voyage").unwrap().sentence_type, "GPRMC");
}

#[tokio::test]
async fn broadcast_subscribers_receive_the_wire_representation() {
    let file = recording(&[GGA]);

    let broadcaster = Arc::new(FixBroadcaster::new(16));
    let mut subscriber = broadcaster.subscribe();

    let pipeline = Pipeline::new()
        .with_source("voyage", Box::new(FileReplaySource::new(file.path())))
        .with_observer(broadcaster.clone());

    pipeline.run().await.unwrap();

    let payload: serde_json::Value = serde_json::from_str(&subscriber.recv().await.unwrap()).unwrap();
    assert_eq!(payload["type"], "GPGGA");
    assert_eq!(payload["isValid"], true);
    assert_eq!(payload["sats"], 8);
    assert!((payload["alt"].as_f64().unwrap() - 545.4).abs() < 1e-9);
}
