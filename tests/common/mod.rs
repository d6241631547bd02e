// Shared test helpers: scripted command output and fixed OS sources.
#![allow(dead_code)]

use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use sysmeter::command::{CommandError, CommandRunner, Invocation};
use sysmeter::models::{MemoryCounters, RawPowerSource};
use sysmeter::platform::{MemorySource, PowerSourceProvider};

pub const SERVICE_ORDER: &str = "An asterisk (*) denotes that a network service is disabled.
(1) Thunderbolt Ethernet
(Hardware Port: Thunderbolt Ethernet, Device: en5)

(2) Wi-Fi
(Hardware Port: Wi-Fi, Device: en0)

(3) Bluetooth PAN
(Hardware Port: Bluetooth PAN, Device: en3)
";

pub const IFCONFIG: &str = "lo0: flags=8049<UP,LOOPBACK,RUNNING,MULTICAST> mtu 16384
\toptions=1203<RXCSUM,TXCSUM,TXSTATUS,SW_TIMESTAMP>
\tinet 127.0.0.1 netmask 0xff000000
en0: flags=8863<UP,BROADCAST,SMART,RUNNING,SIMPLEX,MULTICAST> mtu 1500
\tether a4:83:e7:00:00:01
\tstatus: active
en5: flags=8863<UP,BROADCAST,SMART,RUNNING,SIMPLEX,MULTICAST> mtu 1500
\tstatus: inactive
en3: flags=8863<UP,BROADCAST,RUNNING,SIMPLEX,MULTICAST> mtu 1500
\tstatus: active
";

pub fn netstat(device: &str, ibytes: u64, obytes: u64) -> String {
    format!(
        "Name       Mtu   Network       Address            Ipkts Ierrs     Ibytes    Opkts Oerrs     Obytes  Coll
{device}        1500  <Link#6>    a4:83:e7:00:00:01  1234     0     {ibytes}     5678     0      {obytes}     0
"
    )
}

/// Answers invocations from a table keyed by the full command line, falling
/// back to the program name. Unknown programs fail like a missing binary.
#[derive(Default)]
pub struct ScriptedRunner {
    outputs: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    runs: AtomicU64,
}

impl ScriptedRunner {
    /// A machine on Wi-Fi (en0) with Bluetooth PAN (en3) also active.
    pub fn macos() -> Self {
        let runner = Self::default();
        runner.set("networksetup -listnetworkserviceorder", SERVICE_ORDER);
        runner.set("ifconfig", IFCONFIG);
        runner.set("netstat -bI en0", &netstat("en0", 1000, 500));
        runner.set("netstat -bI en3", &netstat("en3", 70, 30));
        runner
    }

    pub fn set(&self, key: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(key.to_string(), output.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, program: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(program))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<String, CommandError>> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::Relaxed);
            let line = invocation.to_string();
            self.calls.lock().unwrap().push(line.clone());
            let outputs = self.outputs.lock().unwrap();
            outputs
                .get(&line)
                .or_else(|| outputs.get(&invocation.program))
                .cloned()
                .ok_or_else(|| CommandError::Spawn {
                    program: invocation.program.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        })
    }
}

pub struct FixedPowerSources(pub Vec<RawPowerSource>);

impl PowerSourceProvider for FixedPowerSources {
    fn power_sources(&self) -> Vec<RawPowerSource> {
        self.0.clone()
    }
}

pub fn half_charged_battery() -> RawPowerSource {
    RawPowerSource {
        current_capacity: Some(50),
        max_capacity: Some(100),
        design_capacity: Some(125),
        cycle_count: Some(300),
        time_to_full_charge: Some(0),
        time_to_empty: Some(95),
        is_charged: Some(false),
        is_charging: Some(false),
        health_condition: Some("Fair".into()),
        power_source_state: Some("Battery Power".into()),
    }
}

/// Each call reports `n`% used (n = 1, 2, 3, ...) out of 100 bytes.
#[derive(Default)]
pub struct RampMemorySource {
    calls: AtomicU64,
}

impl MemorySource for RampMemorySource {
    fn counters(&self) -> MemoryCounters {
        let n = (self.calls.fetch_add(1, Ordering::Relaxed) + 1) as f64;
        MemoryCounters {
            free: 100.0 - n,
            active: n,
            app_memory: n,
            ..Default::default()
        }
    }

    fn temperature(&self) -> Option<f64> {
        None
    }
}

pub struct FixedMemorySource {
    pub counters: MemoryCounters,
    pub temperature: Option<f64>,
}

impl MemorySource for FixedMemorySource {
    fn counters(&self) -> MemoryCounters {
        self.counters
    }

    fn temperature(&self) -> Option<f64> {
        self.temperature
    }
}
