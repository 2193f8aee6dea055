use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::Instant;

use wsportal_cloud::{FleetProvider, InventoryTable, RegionCatalog};
use wsportal_core::config::Config;
use wsportal_core::types::RegionName;
use wsportal_sync::{pipeline, ImportScope, ImportSummary};

use crate::error::{io_err, DaemonError};
use crate::paths::{run_dir, socket_path};
use crate::protocol::{DaemonRequest, DaemonResponse};

/// Per-region last-successful-import timestamps (Unix seconds).
pub type ImportTimestamps = HashMap<String, u64>;

/// The provider seams the daemon drives. Production wires the AWS clients
/// in here; tests wire the in-memory doubles.
#[derive(Clone)]
pub struct PortalDeps {
    pub catalog: Arc<dyn RegionCatalog>,
    pub provider: Arc<dyn FleetProvider>,
    pub table: Arc<dyn InventoryTable>,
}

struct ImportJob {
    region: Option<String>,
    source: &'static str,
    respond_to: oneshot::Sender<Result<ImportReport, String>>,
}

/// Serialized import outcome handed back over the socket and logged after
/// every interval run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: String,
    pub regions: Vec<String>,
    pub written: usize,
    pub failed: usize,
    pub skipped_regions: usize,
    pub duration_ms: u128,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, deps: PortalDeps, config: Config) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), deps, config))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf, deps: PortalDeps, config: Config) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let timestamps: Arc<RwLock<ImportTimestamps>> = Arc::new(RwLock::new(HashMap::new()));
    let started_at_unix = unix_seconds_now();

    let (import_tx, import_rx) = mpsc::channel::<ImportJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let import_tx = import_tx.clone();
        let interval = config.sync_interval;
        tokio::spawn(async move {
            let result = scheduler_task(interval, import_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let deps = deps.clone();
        let config = config.clone();
        let timestamps = timestamps.clone();
        tokio::spawn(async move {
            let result =
                import_processor_task(deps, config, timestamps, import_rx, shutdown.subscribe())
                    .await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let timestamps = timestamps.clone();
        let import_tx = import_tx.clone();
        let interval = config.sync_interval;
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                timestamps,
                import_tx,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
                interval,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (scheduler_result, processor_result, socket_result, signal_result) = tokio::join!(
        scheduler_handle,
        processor_handle,
        socket_handle,
        signal_handle
    );

    handle_join("scheduler", scheduler_result)?;
    handle_join("import_processor", processor_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn scheduler_task(
    interval: Duration,
    import_tx: mpsc::Sender<ImportJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut ticker = tokio::time::interval(interval);
    // A slow import must not queue up a burst of make-up ticks behind it.
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                match enqueue_import(&import_tx, None, "interval").await {
                    Ok(report) => {
                        tracing::info!(
                            written = report.written,
                            failed = report.failed,
                            skipped_regions = report.skipped_regions,
                            duration_ms = report.duration_ms,
                            "interval import completed",
                        );
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "interval import failed");
                    }
                }
            }
        }
    }

    Ok(())
}

async fn import_processor_task(
    deps: PortalDeps,
    config: Config,
    timestamps: Arc<RwLock<ImportTimestamps>>,
    mut import_rx: mpsc::Receiver<ImportJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = import_rx.recv() => {
                let Some(job) = maybe_job else { break };
                let started = Instant::now();

                let scope = match &job.region {
                    Some(region) => ImportScope::Region(RegionName::from(region.as_str())),
                    None => ImportScope::All,
                };
                let summary = pipeline::run(
                    deps.catalog.as_ref(),
                    deps.provider.as_ref(),
                    deps.table.as_ref(),
                    &config,
                    scope,
                    false,
                )
                .await;

                // Record a timestamp for every region the run touched.
                let now = unix_seconds_now();
                {
                    let mut ts = timestamps.write().await;
                    for region in &summary.regions {
                        ts.insert(region.region.0.clone(), now);
                    }
                }

                let report = build_import_report(job.source, &summary, started.elapsed());
                let _ = job.respond_to.send(Ok(report));
            }
        }
    }

    Ok(())
}

async fn socket_server_task(
    home: PathBuf,
    timestamps: Arc<RwLock<ImportTimestamps>>,
    import_tx: mpsc::Sender<ImportJob>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
    interval: Duration,
) -> Result<(), DaemonError> {
    let run = run_dir(&home);
    if !run.exists() {
        fs::create_dir_all(&run).map_err(|e| io_err(&run, e))?;
    }

    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let timestamps = timestamps.clone();
                let import_tx = import_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                let home = home.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        home,
                        timestamps,
                        import_tx,
                        shutdown_tx,
                        started_at_unix,
                        interval,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    home: PathBuf,
    timestamps: Arc<RwLock<ImportTimestamps>>,
    import_tx: mpsc::Sender<ImportJob>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
    interval: Duration,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: Result<DaemonRequest, _> = serde_json::from_str(&line);
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let cmd = request.cmd.clone();

        let response = match cmd.as_str() {
            "status" => {
                let payload = build_status_payload(
                    &home,
                    timestamps.clone(),
                    started_at_unix,
                    interval,
                )
                .await;
                DaemonResponse::ok(payload)
            }
            "sync" => match enqueue_import(&import_tx, request.region, "socket").await {
                Ok(report) => DaemonResponse::ok(json!(report)),
                Err(err) => DaemonResponse::error(err.to_string()),
            },
            "stop" => {
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if cmd == "stop" {
            break;
        }
    }

    Ok(())
}

async fn build_status_payload(
    home: &Path,
    timestamps: Arc<RwLock<ImportTimestamps>>,
    started_at_unix: u64,
    interval: Duration,
) -> Value {
    // Snapshot timestamps (read lock, dropped before JSON assembly).
    let ts_snapshot: ImportTimestamps = {
        let ts = timestamps.read().await;
        ts.clone()
    };

    let mut names: Vec<&String> = ts_snapshot.keys().collect();
    names.sort();

    let regions: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "last_import_at_unix": ts_snapshot.get(*name).copied().unwrap_or(0),
            })
        })
        .collect();

    // Daemon-wide last import = max of per-region timestamps (0 if none yet).
    let last_import_at_unix = ts_snapshot.values().copied().max().unwrap_or(0);

    json!({
        "running": true,
        "started_at_unix": started_at_unix,
        "last_import_at_unix": last_import_at_unix,
        "interval_seconds": interval.as_secs(),
        "regions": regions,
        "socket": socket_path(home).display().to_string(),
    })
}

async fn enqueue_import(
    import_tx: &mpsc::Sender<ImportJob>,
    region: Option<String>,
    source: &'static str,
) -> Result<ImportReport, DaemonError> {
    let (tx, rx) = oneshot::channel();
    import_tx
        .send(ImportJob {
            region,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("import queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("import response"))?;
    outcome.map_err(DaemonError::Protocol)
}

fn build_import_report(
    source: &'static str,
    summary: &ImportSummary,
    duration: Duration,
) -> ImportReport {
    ImportReport {
        source: source.to_string(),
        regions: summary
            .regions
            .iter()
            .map(|r| r.region.0.clone())
            .collect(),
        written: summary.written(),
        failed: summary.failed(),
        skipped_regions: summary.skipped_regions(),
        duration_ms: duration.as_millis(),
    }
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let run = run_dir(home);
    if !run.exists() {
        fs::create_dir_all(&run).map_err(|e| io_err(&run, e))?;
    }
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
