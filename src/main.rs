use anyhow::Result;
use std::sync::Arc;
use sysmeter::models::{Notification, NotificationKind};
use sysmeter::platform::{SysfsPowerSources, SystemMemorySource};
use sysmeter::samplers::{MemorySampler, NetworkSampler, PowerSampler};
use sysmeter::worker::{Subscription, WorkerHandle};
use sysmeter::*;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Console consumer: logs every published reading.
fn log_readings(handle: &WorkerHandle) -> Vec<Subscription> {
    let log = |n: &Notification| {
        if tracing::enabled!(tracing::Level::DEBUG)
            && let Ok(payload) = serde_json::to_string(n)
        {
            tracing::debug!(%payload, "notification payload");
        }
        log_reading(n)
    };
    [
        NotificationKind::PowerUpdated,
        NotificationKind::MemoryUpdated,
        NotificationKind::NetworkUpdated,
    ]
    .into_iter()
    .map(|kind| handle.subscribe(kind, log))
    .collect()
}

fn log_reading(n: &Notification) {
    match n {
        Notification::PowerUpdated(p) if p.valid => tracing::info!(
            charge_percent = %format!("{:.0}", p.charge() * 100.0),
            power_source = ?p.power_source,
            condition = ?p.condition,
            time_remaining = %p.time_remaining_label(),
            "power"
        ),
        Notification::PowerUpdated(_) => tracing::debug!("power: no battery"),
        Notification::MemoryUpdated(m) => tracing::info!(
            used_percent = %format!("{:.1}", m.reading.used_percentage()),
            temperature = ?m.reading.temperature,
            history_len = m.history.len(),
            "memory"
        ),
        Notification::NetworkUpdated(r) => tracing::info!(
            device = %r.device,
            active_port = ?r.active_port.as_ref().map(ToString::to_string),
            in_bytes_per_sec = r.throughput.in_bytes_per_sec,
            out_bytes_per_sec = r.throughput.out_bytes_per_sec,
            "network"
        ),
        other => tracing::trace!(notification = ?other.kind(), "notification"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let (config_tx, config_rx) = watch::channel(app_config.clone());

    let runner: Arc<dyn command::CommandRunner> = Arc::new(command::SystemCommandRunner);
    let process =
        command::process_name(runner.as_ref(), &app_config.commands, std::process::id()).await;
    tracing::info!(
        process = process.as_deref().unwrap_or(env!("CARGO_PKG_NAME")),
        version = env!("CARGO_PKG_VERSION"),
        "starting telemetry engine"
    );

    let power = Arc::new(PowerSampler::new(Arc::new(SysfsPowerSources::new(
        &app_config.power.supply_path,
    ))));
    let memory = Arc::new(MemorySampler::new(
        Arc::new(SystemMemorySource::new()),
        app_config.memory.history_capacity,
    ));
    let network = Arc::new(NetworkSampler::new(
        runner,
        app_config.commands.clone(),
        &app_config.network,
    ));

    let (handle, worker_handle) = worker::spawn(worker::WorkerDeps {
        power,
        memory,
        network,
        config: config_rx,
    });
    let _console = log_readings(&handle);

    wait_for_signals(&handle, &config_tx).await;

    tracing::info!("Received shutdown signal");
    handle.shutdown();
    let _ = worker_handle.await;
    Ok(())
}

/// Maps process signals onto the worker until a shutdown signal arrives.
/// SIGUSR1/SIGUSR2 carry the desktop's will-sleep/did-wake notifications,
/// SIGHUP reloads the configuration.
#[cfg(unix)]
async fn wait_for_signals(handle: &WorkerHandle, config_tx: &watch::Sender<config::AppConfig>) {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut sigterm), Ok(mut sighup), Ok(mut sleep), Ok(mut wake)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
        signal(SignalKind::user_defined1()),
        signal(SignalKind::user_defined2()),
    ) else {
        tracing::warn!("failed to install signal handlers; only Ctrl-C is handled");
        let _ = tokio::signal::ctrl_c().await;
        return;
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return,
            _ = sigterm.recv() => return,
            _ = sleep.recv() => handle.sleep(),
            _ = wake.recv() => handle.wake(),
            _ = sighup.recv() => match config::AppConfig::load() {
                Ok(new_config) => {
                    if config_tx.borrow().network.device != new_config.network.device {
                        handle.set_network_device(new_config.network.device.clone());
                    }
                    config_tx.send_replace(new_config);
                    tracing::info!("configuration reloaded");
                    handle.refresh_all();
                }
                Err(e) => tracing::warn!(error = %e, "configuration reload failed; keeping current"),
            },
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_handle: &WorkerHandle, _config_tx: &watch::Sender<config::AppConfig>) {
    let _ = tokio::signal::ctrl_c().await;
}
