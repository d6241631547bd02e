// Memory usage models

use serde::{Deserialize, Serialize};

/// Raw memory counters in bytes, as reported by the memory source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryCounters {
    pub free: f64,
    pub active: f64,
    pub inactive: f64,
    pub wired: f64,
    pub compressed: f64,
    pub app_memory: f64,
    pub cached_files: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReading {
    pub free: f64,
    pub active: f64,
    pub inactive: f64,
    pub wired: f64,
    pub compressed: f64,
    pub app_memory: f64,
    pub cached_files: f64,
    /// Memory proximity temperature in °C, when a sensor exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl MemoryReading {
    pub fn new(counters: MemoryCounters, temperature: Option<f64>) -> Self {
        Self {
            free: counters.free,
            active: counters.active,
            inactive: counters.inactive,
            wired: counters.wired,
            compressed: counters.compressed,
            app_memory: counters.app_memory,
            cached_files: counters.cached_files,
            temperature,
        }
    }

    pub fn used(&self) -> f64 {
        self.app_memory + self.wired + self.compressed
    }

    pub fn total(&self) -> f64 {
        self.free + self.active + self.inactive + self.wired + self.compressed
    }

    pub fn all_free(&self) -> f64 {
        self.total() - self.used()
    }

    /// 0.0 when the counters are all zero (subsystem unreadable).
    pub fn used_percentage(&self) -> f64 {
        percentage(self.used(), self.total())
    }

    pub fn all_free_percentage(&self) -> f64 {
        percentage(self.all_free(), self.total())
    }
}

fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}
