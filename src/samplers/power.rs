// Power source sampler.

use super::{InFlight, Refreshable};
use crate::dispatch::MainQueue;
use crate::models::{MetricKind, Notification, PowerReading};
use crate::platform::PowerSourceProvider;
use crate::state::StateCell;
use std::sync::Arc;
use tracing::instrument;

pub struct PowerSampler {
    provider: Arc<dyn PowerSourceProvider>,
    reading: StateCell<PowerReading>,
    in_flight: InFlight,
}

impl PowerSampler {
    pub fn new(provider: Arc<dyn PowerSourceProvider>) -> Self {
        Self {
            provider,
            reading: StateCell::new(PowerReading::invalid()),
            in_flight: InFlight::default(),
        }
    }

    /// Blocking query of the power-source list. An empty list yields an invalid reading.
    #[instrument(skip(self), fields(sampler = "power", operation = "sample"))]
    pub fn sample(&self) -> PowerReading {
        let reading = PowerReading::from_sources(&self.provider.power_sources());
        if reading.valid {
            tracing::debug!(
                current_capacity = reading.current_capacity,
                max_capacity = reading.max_capacity,
                condition = ?reading.condition,
                power_source = ?reading.power_source,
                is_charging = reading.is_charging,
                "power sampled"
            );
        } else {
            tracing::debug!("no power source available");
        }
        reading
    }

    /// Last applied reading.
    pub fn reading(&self) -> PowerReading {
        self.reading.get()
    }
}

impl Refreshable for PowerSampler {
    fn metric(&self) -> MetricKind {
        MetricKind::Power
    }

    fn refresh(self: Arc<Self>, queue: &MainQueue) -> bool {
        if !self.in_flight.begin(MetricKind::Power) {
            return false;
        }
        let worker = self.clone();
        queue.run_async(
            async move {
                tokio::task::spawn_blocking(move || worker.sample())
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(error = %e, operation = "sample_power", "power sample task failed");
                        PowerReading::invalid()
                    })
            },
            move |reading, bus| {
                self.reading.set(reading.clone());
                self.in_flight.finish();
                bus.publish(&Notification::PowerUpdated(reading));
            },
        );
        true
    }
}
