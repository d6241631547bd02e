// Memory sampler with rolling usage history.

use super::{InFlight, Refreshable};
use crate::dispatch::MainQueue;
use crate::history::HistoryBuffer;
use crate::models::{MemoryReading, MemorySnapshot, MetricKind, Notification};
use crate::platform::MemorySource;
use crate::state::StateCell;
use std::sync::Arc;
use tracing::instrument;

pub struct MemorySampler {
    source: Arc<dyn MemorySource>,
    reading: StateCell<MemoryReading>,
    history: StateCell<HistoryBuffer>,
    in_flight: InFlight,
}

impl MemorySampler {
    pub fn new(source: Arc<dyn MemorySource>, history_capacity: usize) -> Self {
        Self {
            source,
            reading: StateCell::new(MemoryReading::default()),
            history: StateCell::new(HistoryBuffer::new(history_capacity)),
            in_flight: InFlight::default(),
        }
    }

    /// Samples and records the used percentage in the history.
    pub fn sample(&self) -> MemoryReading {
        let reading = self.query();
        self.record(&reading);
        reading
    }

    /// Reads counters and temperature without touching state.
    #[instrument(skip(self), fields(sampler = "memory", operation = "query"))]
    fn query(&self) -> MemoryReading {
        let reading = MemoryReading::new(self.source.counters(), self.source.temperature());
        tracing::debug!(
            used = reading.used(),
            total = reading.total(),
            used_percentage = reading.used_percentage(),
            "memory sampled"
        );
        reading
    }

    fn record(&self, reading: &MemoryReading) -> Vec<f64> {
        self.reading.set(reading.clone());
        self.history.update(|h| {
            h.push(reading.used_percentage());
            h.to_vec()
        })
    }

    pub fn reading(&self) -> MemoryReading {
        self.reading.get()
    }

    /// Used percentages, oldest first.
    pub fn history(&self) -> Vec<f64> {
        self.history.get().to_vec()
    }
}

impl Refreshable for MemorySampler {
    fn metric(&self) -> MetricKind {
        MetricKind::Memory
    }

    fn refresh(self: Arc<Self>, queue: &MainQueue) -> bool {
        if !self.in_flight.begin(MetricKind::Memory) {
            return false;
        }
        let worker = self.clone();
        queue.run_async(
            async move {
                tokio::task::spawn_blocking(move || worker.query())
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(error = %e, operation = "sample_memory", "memory sample task failed");
                        MemoryReading::default()
                    })
            },
            move |reading, bus| {
                let history = self.record(&reading);
                self.in_flight.finish();
                bus.publish(&Notification::MemoryUpdated(MemorySnapshot { reading, history }));
            },
        );
        true
    }
}
