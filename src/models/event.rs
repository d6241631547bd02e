// Refresh events and bus notification payloads

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{MemoryReading, NetworkReading, PowerReading};

/// Metric class driven by its own scheduler cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Power,
    Memory,
    Network,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Power, MetricKind::Memory, MetricKind::Network];

    /// Bus key for the refresh request of this metric.
    pub fn refresh_kind(self) -> NotificationKind {
        match self {
            MetricKind::Power => NotificationKind::PowerRefresh,
            MetricKind::Memory => NotificationKind::MemoryRefresh,
            MetricKind::Network => NotificationKind::NetworkRefresh,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Power => "power",
            MetricKind::Memory => "memory",
            MetricKind::Network => "network",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshEvent {
    pub kind: MetricKind,
    /// Unix millis at which the scheduler fired.
    pub timestamp: u64,
}

impl RefreshEvent {
    pub fn now(kind: MetricKind) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { kind, timestamp }
    }
}

/// Memory reading together with the rolling usage history at the time it was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub reading: MemoryReading,
    pub history: Vec<f64>,
}

/// Process-wide event keys. The string form is the stable name consumers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    PowerRefresh,
    MemoryRefresh,
    NetworkRefresh,
    StoreShouldRefresh,
    PowerUpdated,
    MemoryUpdated,
    NetworkUpdated,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::PowerRefresh => "powerRefresh",
            NotificationKind::MemoryRefresh => "memoryRefresh",
            NotificationKind::NetworkRefresh => "networkRefresh",
            NotificationKind::StoreShouldRefresh => "storeShouldRefresh",
            NotificationKind::PowerUpdated => "powerUpdated",
            NotificationKind::MemoryUpdated => "memoryUpdated",
            NotificationKind::NetworkUpdated => "networkUpdated",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification kind: {0}")]
pub struct UnknownNotificationKind(pub String);

impl FromStr for NotificationKind {
    type Err = UnknownNotificationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "powerRefresh" => Ok(NotificationKind::PowerRefresh),
            "memoryRefresh" => Ok(NotificationKind::MemoryRefresh),
            "networkRefresh" => Ok(NotificationKind::NetworkRefresh),
            "storeShouldRefresh" => Ok(NotificationKind::StoreShouldRefresh),
            "powerUpdated" => Ok(NotificationKind::PowerUpdated),
            "memoryUpdated" => Ok(NotificationKind::MemoryUpdated),
            "networkUpdated" => Ok(NotificationKind::NetworkUpdated),
            other => Err(UnknownNotificationKind(other.to_string())),
        }
    }
}

/// Payload carried on the notification bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Notification {
    Refresh(RefreshEvent),
    StoreShouldRefresh,
    PowerUpdated(PowerReading),
    MemoryUpdated(MemorySnapshot),
    NetworkUpdated(NetworkReading),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Refresh(event) => event.kind.refresh_kind(),
            Notification::StoreShouldRefresh => NotificationKind::StoreShouldRefresh,
            Notification::PowerUpdated(_) => NotificationKind::PowerUpdated,
            Notification::MemoryUpdated(_) => NotificationKind::MemoryUpdated,
            Notification::NetworkUpdated(_) => NotificationKind::NetworkUpdated,
        }
    }
}
