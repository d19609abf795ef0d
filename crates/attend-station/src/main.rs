//! Attendance station entry point.
//!
//! Wires together all infrastructure services and runs the station event
//! loop until the window closes or a shutdown signal arrives.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  ├─ load config, init tracing
//!  ├─ single-instance lock ── secondary? notify the running station, exit 0
//!  ├─ open SQLite, build DispatchGateway
//!  ├─ WebSocket bridge (Tokio task)
//!  ├─ lock listener → SecondInstance events (Tokio task)
//!  ├─ shutdown signal → Shutdown event (Tokio task)
//!  └─ AppContext::run  ── on_ready (window), PC/SC driver, event loop
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use attend_station::application::dispatch::DispatchGateway;
use attend_station::application::lifecycle::{
    ContentSource, LifecycleManager, Platform, WindowSpec,
};
use attend_station::infrastructure::card_reader::pcsc::{PcscDriver, PcscSettings};
use attend_station::infrastructure::card_reader::{CardReaderDriver, DriverFactory};
use attend_station::infrastructure::driver_reset::platform_reset_strategy;
use attend_station::infrastructure::instance_lock::{self, InstanceRole};
use attend_station::infrastructure::persistence::{
    Database, SqliteMemberStore, SqliteRecordStore,
};
use attend_station::infrastructure::signals::shutdown_signal;
use attend_station::infrastructure::storage::config::{
    config_file_path, load_config, save_config, RuntimeEnv, StationConfig,
};
use attend_station::infrastructure::ui_bridge::ws_server::{run_server, UiHub, WsWindowHost};
use attend_station::infrastructure::ui_bridge::{AppContext, AppParts, StationEvent};

// ── CLI ───────────────────────────────────────────────────────────────────────

/// NFC attendance station.
#[derive(Debug, Parser)]
#[command(name = "attend-station", about = "NFC attendance station", version)]
struct Cli {
    /// Config file (default: platform config directory).
    #[arg(long, env = "ATTEND_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `ui.ws_port`.
    #[arg(long, env = "ATTEND_WS_PORT")]
    ws_port: Option<u16>,

    /// Overrides `database.path`.
    #[arg(long, env = "ATTEND_DATABASE")]
    database: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of the file config.
    fn apply(&self, cfg: &mut StationConfig) {
        if let Some(port) = self.ws_port {
            cfg.ui.ws_port = port;
        }
        if let Some(path) = &self.database {
            cfg.database.path = Some(path.clone());
        }
    }
}

// ── Wiring helpers ────────────────────────────────────────────────────────────

/// Builds the main window description from config and environment.
fn window_spec(cfg: &StationConfig, env: &RuntimeEnv, base_dir: &Path) -> WindowSpec {
    let content = match (&env.dev_server_url, env.is_development) {
        (Some(url), true) => ContentSource::DevServer(url.clone()),
        _ => {
            let resources = &cfg.window.resources_dir;
            let resources = if resources.is_absolute() {
                resources.clone()
            } else {
                base_dir.join(resources)
            };
            ContentSource::Packaged(resources.join("index.html"))
        }
    };
    WindowSpec {
        width: cfg.window.width,
        height: cfg.window.height,
        frameless: cfg.window.frameless,
        content,
        dev_tools: env.dev_tools(),
    }
}

/// Directory the packaged frontend is resolved against.
fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn pcsc_factory(cfg: &StationConfig) -> DriverFactory {
    let settings = PcscSettings {
        poll_interval: Duration::from_millis(cfg.nfc.poll_interval_ms),
        retry_delay: Duration::from_millis(cfg.nfc.retry_delay_ms),
    };
    Box::new(move || Box::new(PcscDriver::new(settings)) as Box<dyn CardReaderDriver>)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().context("no config path given and no platform default")?,
    };
    let mut cfg = load_config(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let first_run = !config_path.exists();
    cli.apply(&mut cfg);

    // Level from config; `RUST_LOG` wins when set.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.station.log_level)),
        )
        .init();

    info!("{} starting", cfg.station.app_name);
    if first_run {
        match save_config(&config_path, &StationConfig::default()) {
            Ok(()) => info!("wrote default config to {}", config_path.display()),
            Err(e) => warn!("could not write default config: {e}"),
        }
    }
    let env = RuntimeEnv::from_env();

    // ── Single instance ───────────────────────────────────────────────────────
    let lock = match instance_lock::acquire(cfg.instance.lock_port)
        .await
        .context("single-instance lock failed")?
    {
        InstanceRole::Primary(lock) => lock,
        InstanceRole::Secondary => {
            info!("station already running; focused the existing window");
            return Ok(());
        }
    };

    // ── Persistence ───────────────────────────────────────────────────────────
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let db_path = cfg.database_path(&config_dir);
    let db = Database::open(&db_path).context("failed to open attendance database")?;

    // ── Presentation bridge ───────────────────────────────────────────────────
    let hub = UiHub::new();
    let ws_addr: SocketAddr = format!("{}:{}", cfg.ui.bind_address, cfg.ui.ws_port)
        .parse()
        .with_context(|| {
            format!(
                "invalid WebSocket bind address: '{}:{}'",
                cfg.ui.bind_address, cfg.ui.ws_port
            )
        })?;
    let listener = TcpListener::bind(ws_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {ws_addr}"))?;

    // ── Station context ───────────────────────────────────────────────────────
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let reporter = Arc::new(hub.clone());
    let gateway = Arc::new(DispatchGateway::new(
        Arc::new(SqliteMemberStore::new(db.clone())),
        Arc::new(SqliteRecordStore::new(db)),
        reporter.clone(),
        cfg.station.error_dialog_title.clone(),
    ));
    let host = Arc::new(WsWindowHost::new(hub.clone(), cfg.window.launcher.clone()));
    let spec = window_spec(&cfg, &env, &executable_dir());
    let parts = AppParts {
        lifecycle: LifecycleManager::new(Platform::current(), spec, host),
        gateway,
        reset: platform_reset_strategy(&cfg.station.app_name),
        reporter,
        dialog_title: cfg.station.error_dialog_title.clone(),
        driver_factory: pcsc_factory(&cfg),
    };
    let mut ctx = AppContext::new(parts, events_tx.clone());

    // ── Background services ───────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(run_server(
        listener,
        hub,
        events_tx.clone(),
        Arc::clone(&running),
    ));

    let lock_events = events_tx.clone();
    tokio::spawn(async move {
        loop {
            match lock.next_notification().await {
                Ok(()) => {
                    if lock_events.send(StationEvent::SecondInstance).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("single-instance listener stopped: {e}");
                    break;
                }
            }
        }
    });

    let listen_stdin = cfg!(target_os = "windows") && env.is_development;
    let signal_events = events_tx;
    tokio::spawn(async move {
        shutdown_signal(listen_stdin).await;
        let _ = signal_events.send(StationEvent::Shutdown);
    });

    // ── Run ───────────────────────────────────────────────────────────────────
    ctx.on_ready();
    ctx.start_driver();
    info!("{} ready", cfg.station.app_name);
    ctx.run(events_rx).await;

    running.store(false, Ordering::Relaxed);
    match server.await {
        Ok(result) => result?,
        Err(e) => warn!("WebSocket server task failed: {e}"),
    }
    info!("{} stopped", cfg.station.app_name);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn env(is_development: bool, url: Option<&str>, is_test: bool) -> RuntimeEnv {
        RuntimeEnv {
            is_development,
            dev_server_url: url.map(str::to_string),
            is_test,
        }
    }

    #[test]
    fn test_cli_without_arguments_overrides_nothing() {
        // Arrange
        let cli = Cli::parse_from(["attend-station"]);
        let mut cfg = StationConfig::default();

        // Act
        cli.apply(&mut cfg);

        // Assert
        assert_eq!(cfg, StationConfig::default());
    }

    #[test]
    fn test_cli_overrides_port_and_database() {
        let cli = Cli::parse_from([
            "attend-station",
            "--ws-port",
            "9100",
            "--database",
            "/tmp/attendance.db",
        ]);
        let mut cfg = StationConfig::default();

        cli.apply(&mut cfg);

        assert_eq!(cfg.ui.ws_port, 9100);
        assert_eq!(cfg.database.path, Some(PathBuf::from("/tmp/attendance.db")));
    }

    #[test]
    fn test_development_with_dev_server_loads_it_and_opens_dev_tools() {
        let spec = window_spec(
            &StationConfig::default(),
            &env(true, Some("http://localhost:8080"), false),
            Path::new("/opt/attendance"),
        );
        assert_eq!(spec.content.url(), "http://localhost:8080");
        assert!(spec.dev_tools);
        assert_eq!((spec.width, spec.height), (800, 600));
        assert!(spec.frameless);
    }

    #[test]
    fn test_production_loads_packaged_index() {
        let spec = window_spec(
            &StationConfig::default(),
            &env(false, Some("http://localhost:8080"), false),
            Path::new("/opt/attendance"),
        );
        assert_eq!(
            spec.content,
            ContentSource::Packaged(PathBuf::from("/opt/attendance/dist/index.html"))
        );
        assert!(!spec.dev_tools);
    }

    #[test]
    fn test_under_test_harness_dev_tools_stay_closed() {
        let spec = window_spec(
            &StationConfig::default(),
            &env(true, Some("http://localhost:8080"), true),
            Path::new("/opt/attendance"),
        );
        assert!(!spec.dev_tools);
    }
}
