use crate::models::MetricKind;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub memory: MemoryConfig,
    pub network: NetworkConfig,
    pub power: PowerConfig,
    pub commands: CommandsConfig,
    pub monitoring: MonitoringConfig,
}

/// Refresh cadences. Read on every re-arm, so a reload applies from the next tick.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub power_refresh_interval_secs: u64,
    pub memory_refresh_interval_secs: u64,
    pub network_refresh_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            power_refresh_interval_secs: 3,
            memory_refresh_interval_secs: 3,
            network_refresh_interval_secs: 3,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self, kind: MetricKind) -> Duration {
        let secs = match kind {
            MetricKind::Power => self.power_refresh_interval_secs,
            MetricKind::Memory => self.memory_refresh_interval_secs,
            MetricKind::Network => self.network_refresh_interval_secs,
        };
        Duration::from_secs(secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of usage percentages kept for charting.
    pub history_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Monitor this device instead of the active one.
    pub device: Option<String>,
    /// Used when no override is set and no interface is active.
    pub fallback_device: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            device: None,
            fallback_device: "en0".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub supply_path: String,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            supply_path: "/sys/class/power_supply".into(),
        }
    }
}

/// Program + leading arguments of each external tool. The device name or pid
/// is appended where the tool needs one.
///
/// The defaults are the macOS tools (`networksetup`, BSD `ifconfig` with
/// `status:` lines, `netstat -bI`). Linux has no `networksetup`, so with the
/// defaults the network sampler finds no ports and reports the fallback
/// device with zero counters. Point these at equivalent tools (or wrapper
/// scripts printing the same format) to sample the network there.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub interface_status: Vec<String>,
    pub service_order: Vec<String>,
    pub byte_counters: Vec<String>,
    pub process_name: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        fn argv(parts: &[&str]) -> Vec<String> {
            parts.iter().map(|s| s.to_string()).collect()
        }
        Self {
            interface_status: argv(&["ifconfig"]),
            service_order: argv(&["networksetup", "-listnetworkserviceorder"]),
            byte_counters: argv(&["netstat", "-bI"]),
            process_name: argv(&["ps", "-o", "comm=", "-p"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// How often the worker logs its counters at INFO level.
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            stats_log_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Loads `$CONFIG_FILE`, or `config.toml` when unset. A missing default
    /// file yields the built-in defaults; a missing `$CONFIG_FILE` is an error.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::load_from_path(&path),
            Err(_) if !std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                tracing::info!("no {} found, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
            Err(_) => Self::load_from_path(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.scheduler.power_refresh_interval_secs > 0,
            "scheduler.power_refresh_interval_secs must be > 0, got {}",
            self.scheduler.power_refresh_interval_secs
        );
        anyhow::ensure!(
            self.scheduler.memory_refresh_interval_secs > 0,
            "scheduler.memory_refresh_interval_secs must be > 0, got {}",
            self.scheduler.memory_refresh_interval_secs
        );
        anyhow::ensure!(
            self.scheduler.network_refresh_interval_secs > 0,
            "scheduler.network_refresh_interval_secs must be > 0, got {}",
            self.scheduler.network_refresh_interval_secs
        );
        anyhow::ensure!(
            self.memory.history_capacity > 0,
            "memory.history_capacity must be > 0, got {}",
            self.memory.history_capacity
        );
        anyhow::ensure!(
            !self.network.fallback_device.is_empty(),
            "network.fallback_device must be non-empty"
        );
        anyhow::ensure!(
            self.network.device.as_deref() != Some(""),
            "network.device must be non-empty when set"
        );
        anyhow::ensure!(
            !self.power.supply_path.is_empty(),
            "power.supply_path must be non-empty"
        );
        for (key, argv) in [
            ("commands.interface_status", &self.commands.interface_status),
            ("commands.service_order", &self.commands.service_order),
            ("commands.byte_counters", &self.commands.byte_counters),
            ("commands.process_name", &self.commands.process_name),
        ] {
            anyhow::ensure!(
                argv.first().is_some_and(|p| !p.is_empty()),
                "{} must name a program",
                key
            );
        }
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}
