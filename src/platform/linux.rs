// Linux-specific parsers: /sys/class/power_supply uevents and /proc/meminfo.

use crate::models::{
    AC_POWER, BATTERY_POWER, FAIR_CONDITION, MemoryCounters, POOR_CONDITION, RawPowerSource,
};
use std::collections::HashMap;
use std::path::Path;

/// `POWER_SUPPLY_KEY=value` lines, keyed without the `POWER_SUPPLY_` prefix.
pub(crate) fn parse_uevent(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| {
            let key = k.trim().trim_start_matches("POWER_SUPPLY_");
            (key.to_string(), v.trim().to_string())
        })
        .collect()
}

fn int(props: &HashMap<String, String>, key: &str) -> Option<i64> {
    props.get(key)?.parse().ok()
}

/// External supply (mains adapter, USB-C) currently feeding the machine.
pub(crate) fn is_online_supply(props: &HashMap<String, String>) -> bool {
    matches!(props.get("TYPE").map(String::as_str), Some("Mains" | "USB"))
        && props.get("ONLINE").map(String::as_str) == Some("1")
}

fn condition_code(health: &str) -> &'static str {
    match health {
        "Good" => "Good",
        "Cold" | "Warm" | "Cool" | "Overheat" => FAIR_CONDITION,
        _ => POOR_CONDITION,
    }
}

/// Translates a battery uevent into a raw power source. Energy (µWh) is
/// preferred over charge (µAh); both are reported in milli-units. Without
/// either, the capacity percentage is used against a max of 100.
pub(crate) fn battery_from_uevent(
    props: &HashMap<String, String>,
    ac_online: bool,
) -> Option<RawPowerSource> {
    if props.get("TYPE").map(String::as_str) != Some("Battery") {
        return None;
    }
    if props.get("PRESENT").map(String::as_str) == Some("0") {
        return None;
    }

    let (now, full, design) = if let (Some(now), Some(full)) =
        (int(props, "ENERGY_NOW"), int(props, "ENERGY_FULL"))
    {
        (Some(now / 1000), Some(full / 1000), int(props, "ENERGY_FULL_DESIGN").map(|v| v / 1000))
    } else if let (Some(now), Some(full)) = (int(props, "CHARGE_NOW"), int(props, "CHARGE_FULL")) {
        (Some(now / 1000), Some(full / 1000), int(props, "CHARGE_FULL_DESIGN").map(|v| v / 1000))
    } else {
        (int(props, "CAPACITY"), int(props, "CAPACITY").map(|_| 100), None)
    };

    let status = props.get("STATUS").map(String::as_str).unwrap_or("");
    let is_charging = status == "Charging";
    let discharging = status == "Discharging";

    // Rate in the same milli-units per hour as now/full.
    let rate = int(props, "POWER_NOW")
        .or_else(|| int(props, "CURRENT_NOW"))
        .map(|v| v / 1000)
        .filter(|v| *v > 0);
    let minutes = |amount: i64| rate.map(|r| amount * 60 / r);

    let time_to_empty = int(props, "TIME_TO_EMPTY_NOW")
        .map(|secs| secs / 60)
        .or_else(|| discharging.then(|| now.and_then(minutes)).flatten());
    let time_to_full_charge = int(props, "TIME_TO_FULL_NOW")
        .map(|secs| secs / 60)
        .or_else(|| {
            is_charging
                .then(|| match (now, full) {
                    (Some(n), Some(f)) => minutes(f.saturating_sub(n)),
                    _ => None,
                })
                .flatten()
        });

    let power_source_state = if ac_online {
        Some(AC_POWER.to_string())
    } else if discharging {
        Some(BATTERY_POWER.to_string())
    } else {
        None
    };

    Some(RawPowerSource {
        current_capacity: now,
        max_capacity: full,
        design_capacity: design,
        cycle_count: int(props, "CYCLE_COUNT"),
        time_to_full_charge,
        time_to_empty,
        is_charged: Some(status == "Full"),
        is_charging: Some(is_charging),
        health_condition: props.get("HEALTH").map(|h| condition_code(h).to_string()),
        power_source_state,
    })
}

/// Reads every supply under `root`; batteries first in directory-name order.
pub(crate) fn read_power_supplies(root: &Path) -> Vec<RawPowerSource> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut supplies: Vec<(String, HashMap<String, String>)> = entries
        .flatten()
        .filter_map(|entry| {
            let content = std::fs::read_to_string(entry.path().join("uevent")).ok()?;
            Some((
                entry.file_name().to_string_lossy().into_owned(),
                parse_uevent(&content),
            ))
        })
        .collect();
    supplies.sort_by(|a, b| a.0.cmp(&b.0));

    let ac_online = supplies.iter().any(|(_, props)| is_online_supply(props));
    supplies
        .iter()
        .filter_map(|(_, props)| battery_from_uevent(props, ac_online))
        .collect()
}

fn meminfo_kb(fields: &HashMap<&str, u64>, key: &str) -> f64 {
    fields.get(key).copied().unwrap_or(0) as f64 * 1024.0
}

/// Maps /proc/meminfo onto the desktop memory categories (bytes).
pub(crate) fn parse_meminfo(content: &str) -> Option<MemoryCounters> {
    let fields: HashMap<&str, u64> = content
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim(), value))
        })
        .collect();
    if !fields.contains_key("MemTotal") {
        return None;
    }
    Some(MemoryCounters {
        free: meminfo_kb(&fields, "MemFree"),
        active: meminfo_kb(&fields, "Active"),
        inactive: meminfo_kb(&fields, "Inactive"),
        wired: meminfo_kb(&fields, "Unevictable")
            + meminfo_kb(&fields, "SUnreclaim")
            + meminfo_kb(&fields, "KernelStack")
            + meminfo_kb(&fields, "PageTables"),
        compressed: meminfo_kb(&fields, "Zswap"),
        app_memory: meminfo_kb(&fields, "AnonPages"),
        cached_files: meminfo_kb(&fields, "Cached"),
    })
}

#[cfg(target_os = "linux")]
pub(super) fn read_meminfo() -> Option<MemoryCounters> {
    let content = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo(&content)
}

#[cfg(not(target_os = "linux"))]
pub(super) fn read_meminfo() -> Option<MemoryCounters> {
    None
}
