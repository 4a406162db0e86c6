//! pelorus - multi-source NMEA 0183 ingestion and fix dispatch engine
//!
//! This library reads positioning sentences from any number of concurrent
//! sources, validates and decodes them into [`Fix`]es, and delivers each
//! valid fix to every registered observer exactly once, in arrival order.

pub mod fix;
pub mod observer;
pub mod parser;
pub mod pipeline;
pub mod queue;
pub mod sentence;
pub mod sinks;
pub mod source;
pub mod telemetry;

pub use fix::{Fix, FixQuality, RawLine, WireFix};
pub use observer::{FixObserver, ObserverRegistry};
pub use pipeline::Pipeline;
pub use queue::{HandoffQueue, QueueClosed};
pub use sinks::{FixBroadcaster, LatestFixTracker, TrackLogWriter};
pub use source::{FileReplaySource, SentenceSource, UdpSource};
