// Network interface models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Cumulative byte counters of one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkUsage {
    pub in_bytes: u64,
    pub out_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Throughput {
    pub in_bytes_per_sec: f64,
    pub out_bytes_per_sec: f64,
}

impl Throughput {
    /// Rate between two counter samples. A counter that went backwards
    /// (reset, wrap) yields 0 for that direction.
    pub fn between(previous: &NetworkUsage, current: &NetworkUsage, elapsed: Duration) -> Self {
        let dt_secs = elapsed.as_secs_f64();
        if dt_secs <= 0.0 {
            return Self::default();
        }
        Self {
            in_bytes_per_sec: current.in_bytes.saturating_sub(previous.in_bytes) as f64 / dt_secs,
            out_bytes_per_sec: current.out_bytes.saturating_sub(previous.out_bytes) as f64
                / dt_secs,
        }
    }
}

/// Configured network service, keyed by its BSD device name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfacePort {
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl InterfacePort {
    pub fn id(&self) -> &str {
        &self.device
    }
}

impl fmt::Display for InterfacePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => write!(f, "{} ({})", port, self.device),
            None => f.write_str(&self.device),
        }
    }
}

/// Interface name with its link status, as listed by the interface-status tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStatus {
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkReading {
    /// Device the counters were read from.
    pub device: String,
    pub usage: NetworkUsage,
    pub throughput: Throughput,
    pub ports: Vec<InterfacePort>,
    #[serde(default)]
    pub active_port: Option<InterfacePort>,
}
