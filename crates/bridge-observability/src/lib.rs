use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const OBS_TARGET: &str = "bridge.obs";
const LOG_SUFFIX: &str = "jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Dashboard,
    Poller,
}

impl ProcessKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessKind::Dashboard => "dashboard",
            ProcessKind::Poller => "poller",
        }
    }

    /// File name prefix of this process's rolled log files.
    pub fn log_prefix(self) -> String {
        format!("bridge.{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub logs_dir: PathBuf,
    pub retention_days: u64,
    /// Used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl LogSettings {
    pub fn new(logs_dir: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            retention_days,
            default_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggingInitInfo {
    pub process: ProcessKind,
    pub logs_dir: String,
    pub prefix: String,
    pub retention_days: u64,
    pub pruned_files: usize,
    pub initialized_at: chrono::DateTime<Utc>,
}

/// One structured record about a cache change, keyed the way the dashboard
/// addresses things: context, service, stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObservabilityEvent<'a> {
    pub event: &'a str,
    pub component: &'a str,
    pub keptn_context: Option<&'a str>,
    pub service: Option<&'a str>,
    pub stage: Option<&'a str>,
    pub status: Option<&'a str>,
    pub count: Option<usize>,
    pub detail: Option<&'a str>,
}

macro_rules! obs_event {
    ($level:expr, $process:expr, $event:expr) => {
        tracing::event!(
            target: OBS_TARGET,
            $level,
            process = $process.as_str(),
            component = $event.component,
            event = $event.event,
            keptn_context = $event.keptn_context.unwrap_or(""),
            service = $event.service.unwrap_or(""),
            stage = $event.stage.unwrap_or(""),
            status = $event.status.unwrap_or(""),
            count = $event.count.unwrap_or(0),
            detail = $event.detail.unwrap_or(""),
            "observability_event"
        )
    };
}

pub fn emit_event(level: Level, process: ProcessKind, event: ObservabilityEvent<'_>) {
    // `tracing` needs the level at compile time.
    match level {
        Level::ERROR => obs_event!(Level::ERROR, process, event),
        Level::WARN => obs_event!(Level::WARN, process, event),
        Level::INFO => obs_event!(Level::INFO, process, event),
        Level::DEBUG => obs_event!(Level::DEBUG, process, event),
        _ => obs_event!(Level::TRACE, process, event),
    }
}

/// Installs an env-filtered console layer plus a daily-rolled JSONL file
/// layer, after pruning files older than the retention window. An already
/// installed global subscriber is kept; the returned guard must outlive the
/// process's logging.
pub fn init_process_logging(
    process: ProcessKind,
    settings: &LogSettings,
) -> anyhow::Result<(WorkerGuard, LoggingInitInfo)> {
    fs::create_dir_all(&settings.logs_dir)?;
    let pruned_files = prune_rolled_logs(&settings.logs_dir, process, settings.retention_days)?;

    let prefix = process.log_prefix();
    let appender = RollingBuilder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(&prefix)
        .filename_suffix(LOG_SUFFIX)
        .build(&settings.logs_dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.default_filter));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_current_span(false)
                .with_span_list(false),
        )
        .try_init()
        .is_ok();

    let info = LoggingInitInfo {
        process,
        logs_dir: settings.logs_dir.display().to_string(),
        prefix,
        retention_days: settings.retention_days,
        pruned_files,
        initialized_at: Utc::now(),
    };
    if installed {
        emit_event(
            Level::INFO,
            process,
            ObservabilityEvent {
                event: "logging.initialized",
                component: "observability",
                count: Some(pruned_files),
                detail: Some(&info.logs_dir),
                ..Default::default()
            },
        );
    }
    Ok((guard, info))
}

/// Date stamp of a rolled file named `<prefix>.<YYYY-MM-DD>.jsonl`.
fn rolled_file_date(file_name: &str, prefix: &str) -> Option<NaiveDate> {
    let stamp = file_name
        .strip_prefix(prefix)?
        .strip_prefix('.')?
        .strip_suffix(LOG_SUFFIX)?
        .strip_suffix('.')?;
    NaiveDate::parse_from_str(stamp, "%Y-%m-%d").ok()
}

/// Removes this process's rolled files dated before the retention window and
/// returns how many were deleted. Files of other processes are untouched.
pub fn prune_rolled_logs(
    logs_dir: &Path,
    process: ProcessKind,
    retention_days: u64,
) -> anyhow::Result<usize> {
    let today = Utc::now().date_naive();
    let cutoff = today.checked_sub_days(Days::new(retention_days)).unwrap_or(NaiveDate::MIN);
    let prefix = process.log_prefix();

    let expired: Vec<PathBuf> = fs::read_dir(logs_dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| rolled_file_date(name, &prefix))
                .is_some_and(|date| date < cutoff)
        })
        .collect();

    let mut removed = 0;
    for path in expired {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => tracing::debug!(path = %path.display(), %err, "could not prune log file"),
        }
    }
    Ok(removed)
}

/// Default log location below a host's data directory.
pub fn default_logs_dir(data_root: &Path) -> PathBuf {
    data_root.join("logs")
}
