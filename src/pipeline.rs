//! The ingestion pipeline: one reader task per source feeding a shared
//! hand-off queue, one decode task draining it and fanning valid fixes out
//! to the observer registry.
//!
//! Shutdown is cooperative and two-phase. Cancelling the pipeline's token
//! aborts each reader's in-flight read so every reader exits; only after
//! the last reader is done is the queue shut down, which lets the decode
//! task drain whatever is still queued before it observes the closed
//! signal. Closing the queue alone would leave readers parked on their
//! transports forever.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::fix::RawLine;
use crate::observer::{FixObserver, ObserverRegistry};
use crate::parser;
use crate::queue::HandoffQueue;
use crate::source::SentenceSource;

pub struct Pipeline {
    sources: Vec<(String, Box<dyn SentenceSource>)>,
    observers: ObserverRegistry,
    shutdown: CancellationToken,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            observers: ObserverRegistry::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Add a named source. The name is stamped on every fix the source
    /// produces; it is the only way consumers can recover per-source
    /// ordering from the interleaved stream.
    pub fn with_source(mut self, id: impl Into<String>, source: Box<dyn SentenceSource>) -> Self {
        self.sources.push((id.into(), source));
        self
    }

    /// Register an observer. Observers are invoked in registration order.
    pub fn with_observer(mut self, observer: Arc<dyn FixObserver>) -> Self {
        self.observers.register(observer);
        self
    }

    /// Token that stops the pipeline when cancelled. Clone it into signal
    /// handlers or supervisors; `run` owns the rest of the shutdown
    /// sequence.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until every source reaches end-of-stream or the shutdown token
    /// is cancelled, then drain and return.
    pub async fn run(self) -> Result<()> {
        let Self {
            sources,
            observers,
            shutdown,
        } = self;

        info!(
            sources = sources.len(),
            observers = observers.len(),
            "starting ingestion pipeline"
        );

        let queue: Arc<HandoffQueue<RawLine>> = Arc::new(HandoffQueue::new());

        let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(sources.len());
        for (source_id, source) in sources {
            readers.push(spawn_reader(
                source_id,
                source,
                queue.clone(),
                shutdown.clone(),
            ));
        }

        let consumer = spawn_consumer(queue.clone(), observers);

        // Phase one: wait for the readers. They exit on end-of-stream, on a
        // transport failure, or when the token aborts their blocking read.
        let mut reader_failure = None;
        for reader in readers {
            if let Err(e) = reader.await {
                reader_failure.get_or_insert(e);
            }
        }

        // Phase two: no producer is left, so close the queue and let the
        // decode task drain it.
        queue.shutdown();
        consumer.await.context("decode task panicked")?;

        if let Some(e) = reader_failure {
            return Err(anyhow::Error::new(e)).context("source reader task panicked");
        }
        info!("ingestion pipeline stopped");
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_reader(
    source_id: String,
    mut source: Box<dyn SentenceSource>,
    queue: Arc<HandoffQueue<RawLine>>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let span = info_span!("source_reader", source = %source_id);
    tokio::spawn(
        async move {
            if let Err(e) = source.open().await {
                warn!(error = %e, "source failed to open");
                return;
            }

            loop {
                let line = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    read = source.next_line() => match read {
                        Ok(Some(line)) => line,
                        Ok(None) => {
                            info!("source reached end of stream");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "source read failed, reader exiting");
                            break;
                        }
                    },
                };

                if line.trim().is_empty() {
                    continue;
                }
                metrics::counter!("nmea.lines.received_total").increment(1);

                if queue.push(RawLine::new(source_id.as_str(), line)).is_err() {
                    // Queue closed under us; shutdown is already underway.
                    break;
                }
                metrics::counter!("nmea.lines.queued_total").increment(1);
            }

            source.close().await;
        }
        .instrument(span),
    )
}

fn spawn_consumer(
    queue: Arc<HandoffQueue<RawLine>>,
    observers: ObserverRegistry,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let mut dispatched = 0u64;

            while let Some(line) = queue.wait_and_pop().await {
                metrics::gauge!("nmea.queue.depth").set(queue.len() as f64);

                let fix = parser::parse(&line);
                if fix.is_valid {
                    metrics::counter!("nmea.parse.valid_total").increment(1);
                    trace!(source = %fix.source_id, kind = %fix.sentence_type, "fix decoded");
                    observers.notify(&fix);
                    dispatched += 1;
                } else {
                    metrics::counter!("nmea.parse.invalid_total").increment(1);
                    debug!(source = %line.source_id, line = %line.text, "line discarded");
                }
            }

            info!(dispatched, "decode task drained and stopped");
        }
        .instrument(info_span!("decoder")),
    )
}
