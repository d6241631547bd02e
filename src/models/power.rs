// Power source / battery models

use serde::{Deserialize, Serialize};

/// Battery health condition code reported as poor.
pub const POOR_CONDITION: &str = "Poor";
/// Battery health condition code reported as fair.
pub const FAIR_CONDITION: &str = "Fair";
/// Power source state code while on external power.
pub const AC_POWER: &str = "AC Power";
/// Power source state code while discharging.
pub const BATTERY_POWER: &str = "Battery Power";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryCondition {
    #[default]
    Good,
    Fair,
    Poor,
}

impl BatteryCondition {
    /// Closed mapping from the raw health code. Unknown codes are treated as good.
    pub fn from_code(code: &str) -> Self {
        match code {
            POOR_CONDITION => BatteryCondition::Poor,
            FAIR_CONDITION => BatteryCondition::Fair,
            _ => BatteryCondition::Good,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerSourceState {
    Battery,
    AcPower,
    #[default]
    Unknown,
}

impl PowerSourceState {
    /// Closed mapping from the raw power source state code.
    pub fn from_code(code: &str) -> Self {
        match code {
            AC_POWER => PowerSourceState::AcPower,
            BATTERY_POWER => PowerSourceState::Battery,
            _ => PowerSourceState::Unknown,
        }
    }
}

/// One entry of the OS power-source list, before classification.
/// Every field is optional; absent values fall back to the reading defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPowerSource {
    pub current_capacity: Option<i64>,
    pub max_capacity: Option<i64>,
    pub design_capacity: Option<i64>,
    pub cycle_count: Option<i64>,
    pub time_to_full_charge: Option<i64>,
    pub time_to_empty: Option<i64>,
    pub is_charged: Option<bool>,
    pub is_charging: Option<bool>,
    pub health_condition: Option<String>,
    pub power_source_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerReading {
    pub current_capacity: i64,
    pub max_capacity: i64,
    #[serde(default)]
    pub design_capacity: i64,
    #[serde(default)]
    pub cycle_count: i64,
    pub condition: BatteryCondition,
    pub power_source: PowerSourceState,
    /// Minutes until fully charged.
    pub time_to_full_charge: i64,
    /// Minutes until empty.
    pub time_to_empty: i64,
    pub is_charged: bool,
    pub is_charging: bool,
    /// False when no power source could be read; every other field is then a default.
    pub valid: bool,
}

impl PowerReading {
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Classify the first entry of a power-source list.
    pub fn from_sources(sources: &[RawPowerSource]) -> Self {
        match sources.first() {
            Some(raw) => Self::from_raw(raw),
            None => Self::invalid(),
        }
    }

    pub fn from_raw(raw: &RawPowerSource) -> Self {
        Self {
            current_capacity: raw.current_capacity.unwrap_or(0),
            max_capacity: raw.max_capacity.unwrap_or(0),
            design_capacity: raw.design_capacity.unwrap_or(0),
            cycle_count: raw.cycle_count.unwrap_or(0),
            condition: raw
                .health_condition
                .as_deref()
                .map(BatteryCondition::from_code)
                .unwrap_or_default(),
            power_source: raw
                .power_source_state
                .as_deref()
                .map(PowerSourceState::from_code)
                .unwrap_or_default(),
            time_to_full_charge: raw.time_to_full_charge.unwrap_or(0),
            time_to_empty: raw.time_to_empty.unwrap_or(0),
            is_charged: raw.is_charged.unwrap_or(false),
            is_charging: raw.is_charging.unwrap_or(false),
            valid: true,
        }
    }

    /// Fraction of max capacity currently held, 0.0 when max capacity is unknown.
    pub fn charge(&self) -> f64 {
        if self.max_capacity > 0 {
            self.current_capacity as f64 / self.max_capacity as f64
        } else {
            0.0
        }
    }

    /// Max capacity relative to design capacity.
    pub fn health(&self) -> Option<f64> {
        (self.design_capacity > 0).then(|| self.max_capacity as f64 / self.design_capacity as f64)
    }

    /// Minutes left in the current direction (to empty on battery, to full while charging).
    pub fn time_remaining(&self) -> Option<i64> {
        if !self.valid {
            return None;
        }
        let minutes = match self.power_source {
            PowerSourceState::Battery => self.time_to_empty,
            _ if self.is_charging => self.time_to_full_charge,
            _ => return None,
        };
        (minutes > 0).then_some(minutes)
    }

    /// "H:MM" while running on battery, "∞" otherwise.
    pub fn time_remaining_label(&self) -> String {
        if self.power_source != PowerSourceState::Battery {
            return "∞".to_string();
        }
        match self.time_remaining() {
            Some(minutes) => format!("{}:{:02}", minutes / 60, minutes % 60),
            None => "-:--".to_string(),
        }
    }
}
