// OS adapters behind the power and memory samplers.

mod linux;

use crate::models::{MemoryCounters, RawPowerSource};
use std::path::PathBuf;
use std::sync::Mutex;
use sysinfo::{Components, System};

/// The OS power-source list, first entry being the internal battery.
pub trait PowerSourceProvider: Send + Sync {
    fn power_sources(&self) -> Vec<RawPowerSource>;
}

/// Raw memory counters and an optional memory temperature.
pub trait MemorySource: Send + Sync {
    fn counters(&self) -> MemoryCounters;
    fn temperature(&self) -> Option<f64>;
}

/// Power sources from the kernel's power_supply class.
#[derive(Debug, Clone)]
pub struct SysfsPowerSources {
    root: PathBuf,
}

impl SysfsPowerSources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PowerSourceProvider for SysfsPowerSources {
    fn power_sources(&self) -> Vec<RawPowerSource> {
        linux::read_power_supplies(&self.root)
    }
}

/// Memory counters from /proc/meminfo, falling back to sysinfo totals;
/// temperature from sysinfo components.
pub struct SystemMemorySource {
    sys: Mutex<System>,
    components: Mutex<Components>,
}

impl Default for SystemMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMemorySource {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
            components: Mutex::new(Components::new_with_refreshed_list()),
        }
    }

    fn sysinfo_counters(&self) -> MemoryCounters {
        let Ok(mut sys) = self.sys.lock() else {
            tracing::warn!(operation = "memory_counters", "sysinfo lock poisoned");
            return MemoryCounters::default();
        };
        sys.refresh_memory();
        let free = sys.free_memory();
        let used = sys.used_memory();
        let reclaimable = sys.available_memory().saturating_sub(free);
        MemoryCounters {
            free: free as f64,
            active: used as f64,
            inactive: reclaimable as f64,
            wired: 0.0,
            compressed: 0.0,
            app_memory: used as f64,
            cached_files: reclaimable as f64,
        }
    }
}

impl MemorySource for SystemMemorySource {
    fn counters(&self) -> MemoryCounters {
        linux::read_meminfo().unwrap_or_else(|| self.sysinfo_counters())
    }

    fn temperature(&self) -> Option<f64> {
        let Ok(mut components) = self.components.lock() else {
            tracing::warn!(operation = "memory_temperature", "sysinfo components lock poisoned");
            return None;
        };
        components.refresh(false);
        memory_temperature(
            components
                .list()
                .iter()
                .map(|c| (c.label(), c.temperature())),
        )
    }
}

/// First reading from a sensor whose label names memory.
pub(crate) fn memory_temperature<'a>(
    sensors: impl Iterator<Item = (&'a str, Option<f32>)>,
) -> Option<f64> {
    sensors
        .filter(|(label, _)| {
            let label = label.to_ascii_lowercase();
            label.contains("mem") || label.contains("dimm")
        })
        .find_map(|(_, temp)| temp.filter(|t| t.is_finite()).map(f64::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_memory_sensor_with_a_value() {
        let sensors = [
            ("coretemp Package id 0", Some(55.0)),
            ("Memory Proximity", None),
            ("SODIMM 1", Some(41.5)),
        ];
        assert_eq!(memory_temperature(sensors.into_iter()), Some(41.5));
    }

    #[test]
    fn no_memory_sensor_leaves_temperature_unset() {
        let sensors = [("acpitz temp1", Some(40.0))];
        assert_eq!(memory_temperature(sensors.into_iter()), None);
    }
}
