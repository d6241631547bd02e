// Domain models: readings, refresh events and bus payloads

mod event;
mod memory;
mod network;
mod power;

pub use event::{
    MemorySnapshot, MetricKind, Notification, NotificationKind, RefreshEvent,
    UnknownNotificationKind,
};
pub use memory::{MemoryCounters, MemoryReading};
pub use network::{InterfacePort, InterfaceStatus, NetworkReading, NetworkUsage, Throughput};
pub use power::{
    AC_POWER, BATTERY_POWER, BatteryCondition, FAIR_CONDITION, POOR_CONDITION, PowerReading,
    PowerSourceState, RawPowerSource,
};
