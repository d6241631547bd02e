// Text parsers for diagnostic tool output. Malformed lines are skipped, never fatal.

use crate::models::{InterfacePort, InterfaceStatus, NetworkUsage};

const DEVICE_KEY: &str = "Device: ";
const PORT_KEY: &str = "Port: ";

/// Parses one service-order line, e.g. `(Hardware Port: Wi-Fi, Device: en0)`.
/// Lines not wrapped in parentheses, or without a device, are not ports.
pub fn parse_port_line(line: &str) -> Option<InterfacePort> {
    let inner = line.trim_end().strip_prefix('(')?.strip_suffix(')')?;
    let device = field_value(inner, DEVICE_KEY)?;
    let port = field_value(inner, PORT_KEY);
    Some(InterfacePort {
        device: device.to_string(),
        port: port.map(str::to_string),
    })
}

/// Text after `key` up to the next comma. None when absent or empty.
fn field_value<'a>(s: &'a str, key: &str) -> Option<&'a str> {
    let start = s.find(key)? + key.len();
    let rest = &s[start..];
    let value = rest.split(',').next().unwrap_or(rest);
    (!value.is_empty()).then_some(value)
}

/// Ports in service order.
pub fn parse_service_order(output: &str) -> Vec<InterfacePort> {
    output.lines().filter_map(parse_port_line).collect()
}

fn is_indented(line: &str) -> bool {
    line.starts_with('\t') || line.starts_with(' ')
}

/// Parses an interface listing: an unindented `name: ...` line starts an
/// interface, an indented `status: <value>` line belongs to the last one.
pub fn parse_interface_statuses(output: &str) -> Vec<InterfaceStatus> {
    let mut interfaces: Vec<InterfaceStatus> = Vec::new();
    for line in output.lines() {
        if !is_indented(line) {
            if let Some((name, _)) = line.split_once(':') {
                interfaces.push(InterfaceStatus {
                    name: name.to_string(),
                    status: None,
                });
            }
            continue;
        }
        let parts: Vec<&str> = line
            .split(':')
            .map(|p| p.trim_matches([' ', '\t']))
            .collect();
        if let [key, value] = parts.as_slice()
            && *key == "status"
            && let Some(last) = interfaces.last_mut()
        {
            last.status = Some(value.to_string());
        }
    }
    interfaces
}

/// Names of interfaces whose status is `active`, in listing order.
pub fn active_interfaces(statuses: &[InterfaceStatus]) -> Vec<String> {
    statuses
        .iter()
        .filter(|s| s.status.as_deref() == Some("active"))
        .map(|s| s.name.clone())
        .collect()
}

pub fn parse_active_interfaces(output: &str) -> Vec<String> {
    active_interfaces(&parse_interface_statuses(output))
}

/// First port in service order whose device is active.
pub fn select_active_port(ports: &[InterfacePort], active: &[String]) -> Option<InterfacePort> {
    ports
        .iter()
        .find(|p| active.iter().any(|a| *a == p.device))
        .cloned()
}

/// Reads `ibytes`/`obytes` from the first data row, located by header name
/// (case-insensitive). Missing columns or unparsable values read as 0.
pub fn parse_byte_counters(output: &str) -> NetworkUsage {
    let mut rows = output.lines().filter(|l| !l.trim().is_empty());
    let (Some(header), Some(row)) = (rows.next(), rows.next()) else {
        return NetworkUsage::default();
    };
    let headers: Vec<&str> = header.split_whitespace().collect();
    let values: Vec<&str> = row.split_whitespace().collect();
    NetworkUsage {
        in_bytes: column_value(&headers, &values, "ibytes").unwrap_or(0),
        out_bytes: column_value(&headers, &values, "obytes").unwrap_or(0),
    }
}

fn column_value(headers: &[&str], values: &[&str], column: &str) -> Option<u64> {
    let idx = headers.iter().position(|h| h.eq_ignore_ascii_case(column))?;
    values.get(idx)?.parse().ok()
}

/// Trimmed process command name; None for empty output.
pub fn parse_process_name(output: &str) -> Option<String> {
    let name = output.trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_stops_at_comma() {
        assert_eq!(field_value("Port: Wi-Fi, Device: en0", "Port: "), Some("Wi-Fi"));
        assert_eq!(field_value("Port: Wi-Fi, Device: en0", "Device: "), Some("en0"));
        assert_eq!(field_value("Port: Wi-Fi, Device: ", "Device: "), None);
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let headers = ["Name", "Ibytes", "Obytes"];
        let values = ["en0", "12", "34"];
        assert_eq!(column_value(&headers, &values, "ibytes"), Some(12));
        assert_eq!(column_value(&headers, &values, "obytes"), Some(34));
        assert_eq!(column_value(&headers, &values, "coll"), None);
    }
}
