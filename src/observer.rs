//! Fan-out of decoded fixes to registered consumers.
//!
//! Observers are registered before the pipeline starts and invoked
//! synchronously, in registration order, once per valid fix. A failing or
//! panicking observer is logged and skipped; it never stops delivery to the
//! observers after it and never takes down the decode loop.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, warn};

use crate::fix::Fix;

/// A consumer of decoded fixes.
///
/// Callbacks receive a shared reference and must not hold onto it past the
/// call; anything an observer wants to keep, it clones. Observers should
/// complete quickly: a slow observer delays every observer registered after
/// it and the consumer's next dequeue.
pub trait FixObserver: Send + Sync {
    /// Short identifier used in logs and metrics.
    fn name(&self) -> &'static str;

    fn on_fix(&self, fix: &Fix) -> Result<()>;
}

/// Ordered, append-only list of observers. Read-only once dispatch starts,
/// so delivery needs no locking.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn FixObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn FixObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver one fix to every observer in registration order.
    pub fn notify(&self, fix: &Fix) {
        for observer in &self.observers {
            // An observer that unwinds must not tear down the decode loop.
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_fix(fix)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(observer = observer.name(), error = %e, "observer rejected fix");
                    metrics::counter!("nmea.observer.error_total").increment(1);
                }
                Err(_) => {
                    error!(observer = observer.name(), "observer panicked while handling fix");
                    metrics::counter!("nmea.observer.panic_total").increment(1);
                }
            }
        }
    }
}
