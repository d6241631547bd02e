// Network sampler: active interface resolution, byte counters and throughput.

use super::{InFlight, Refreshable};
use crate::command::{CommandRunner, Invocation, output_or_empty};
use crate::config::{CommandsConfig, NetworkConfig};
use crate::dispatch::MainQueue;
use crate::models::{InterfacePort, MetricKind, NetworkReading, NetworkUsage, Notification, Throughput};
use crate::parsers;
use crate::state::StateCell;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::instrument;

/// Result of one query, before rates are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkProbe {
    pub device: String,
    pub usage: NetworkUsage,
    pub ports: Vec<InterfacePort>,
    pub active_port: Option<InterfacePort>,
}

/// Remembers the previous counters of the monitored device.
#[derive(Debug, Clone, Default)]
pub struct RateTracker {
    last: Option<(String, NetworkUsage, Instant)>,
}

impl RateTracker {
    /// Throughput since the previous sample of the same device. The first
    /// sample, and the first after a device switch, reports zero.
    pub fn record(&mut self, device: &str, usage: NetworkUsage, at: Instant) -> Throughput {
        let throughput = match &self.last {
            Some((prev_device, prev, prev_at)) if prev_device == device => {
                Throughput::between(prev, &usage, at.saturating_duration_since(*prev_at))
            }
            _ => Throughput::default(),
        };
        self.last = Some((device.to_string(), usage, at));
        throughput
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

pub struct NetworkSampler {
    runner: Arc<dyn CommandRunner>,
    commands: CommandsConfig,
    fallback_device: String,
    device_override: StateCell<Option<String>>,
    rates: StateCell<RateTracker>,
    reading: StateCell<NetworkReading>,
    in_flight: InFlight,
}

impl NetworkSampler {
    pub fn new(runner: Arc<dyn CommandRunner>, commands: CommandsConfig, network: &NetworkConfig) -> Self {
        Self {
            runner,
            commands,
            fallback_device: network.fallback_device.clone(),
            device_override: StateCell::new(network.device.clone()),
            rates: StateCell::new(RateTracker::default()),
            reading: StateCell::new(NetworkReading::default()),
            in_flight: InFlight::default(),
        }
    }

    async fn run(&self, template: &[String], extra: Option<&str>) -> String {
        match Invocation::from_template(template, extra) {
            Ok(invocation) => output_or_empty(self.runner.as_ref(), &invocation).await,
            Err(e) => {
                tracing::warn!(error = %e, "network command not configured");
                String::new()
            }
        }
    }

    /// Resolves the ports, the active port and the target device, then reads
    /// the device's byte counters.
    #[instrument(skip(self), fields(sampler = "network", operation = "sample"))]
    pub async fn sample(&self, device_override: Option<&str>) -> NetworkProbe {
        let (service_order, interface_status) = tokio::join!(
            self.run(&self.commands.service_order, None),
            self.run(&self.commands.interface_status, None),
        );
        let ports = parsers::parse_service_order(&service_order);
        let active = parsers::parse_active_interfaces(&interface_status);
        let active_port = parsers::select_active_port(&ports, &active);

        tracing::debug!(ports = ?ports, active = ?active, active_port = ?active_port, "network interfaces");

        let device = device_override
            .map(str::to_string)
            .or_else(|| active_port.as_ref().map(|p| p.device.clone()))
            .unwrap_or_else(|| self.fallback_device.clone());

        let counters = self.run(&self.commands.byte_counters, Some(&device)).await;
        let usage = parsers::parse_byte_counters(&counters);

        NetworkProbe {
            device,
            usage,
            ports,
            active_port,
        }
    }

    /// Derives throughput against the previous probe and stores the reading.
    pub fn apply(&self, probe: NetworkProbe, at: Instant) -> NetworkReading {
        let throughput = self.rates.update(|r| r.record(&probe.device, probe.usage, at));
        let reading = NetworkReading {
            device: probe.device,
            usage: probe.usage,
            throughput,
            ports: probe.ports,
            active_port: probe.active_port,
        };
        self.reading.set(reading.clone());
        reading
    }

    pub fn reading(&self) -> NetworkReading {
        self.reading.get()
    }

    pub fn device_override(&self) -> Option<String> {
        self.device_override.get()
    }

    /// Pins sampling to `device` (None = follow the active interface). Rates restart from zero.
    pub fn set_device_override(&self, device: Option<String>) {
        tracing::info!(device = ?device, "network device override changed");
        self.device_override.set(device);
        self.rates.update(RateTracker::reset);
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.is_busy()
    }
}

impl Refreshable for NetworkSampler {
    fn metric(&self) -> MetricKind {
        MetricKind::Network
    }

    fn refresh(self: Arc<Self>, queue: &MainQueue) -> bool {
        if !self.in_flight.begin(MetricKind::Network) {
            return false;
        }
        let worker = self.clone();
        let device = self.device_override();
        queue.run_async(
            async move { worker.sample(device.as_deref()).await },
            move |probe, bus| {
                let reading = self.apply(probe, Instant::now());
                self.in_flight.finish();
                bus.publish(&Notification::NetworkUpdated(reading));
            },
        );
        true
    }
}
