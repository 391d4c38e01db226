use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IngestionError;
use crate::pipeline::Orientation;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the file could not be summarized).
    Error,
    /// Critical error (typically I/O, network or other infrastructure failures).
    Critical,
}

impl IngestionSeverity {
    /// Severity of a failed run.
    pub fn for_error(e: &IngestionError) -> Self {
        match e {
            IngestionError::Io(_) | IngestionError::InputIo { .. } | IngestionError::Http(_) => {
                IngestionSeverity::Critical
            }
            IngestionError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
                _ => IngestionSeverity::Error,
            },
            _ => IngestionSeverity::Error,
        }
    }
}

/// Context about one pipeline run.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// The input path (or a label such as the download URL).
    pub path: PathBuf,
    /// Name of the format profile used.
    pub profile: String,
}

/// Counters reported on a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Data rows read from the file.
    pub input_rows: usize,
    /// Rows removed by the status filter.
    pub dropped_status: usize,
    /// Rows removed because their date did not parse.
    pub dropped_dates: usize,
    /// Melted cells removed as leaked legend text.
    pub dropped_legend: usize,
    /// Melted cells removed because of an unknown month label.
    pub dropped_unknown_month: usize,
    /// Monthly records produced.
    pub records: usize,
    /// Path taken through the pipeline.
    pub orientation: Option<Orientation>,
}

/// Observer interface for pipeline outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a run succeeds.
    fn on_success(&self, _ctx: &IngestionContext, _stats: RunStats) {}

    /// Called when a run fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: RunStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: RunStats) {
        tracing::info!(
            profile = %ctx.profile,
            path = %ctx.path.display(),
            orientation = ?stats.orientation,
            input_rows = stats.input_rows,
            dropped_status = stats.dropped_status,
            dropped_dates = stats.dropped_dates,
            dropped_legend = stats.dropped_legend,
            dropped_unknown_month = stats.dropped_unknown_month,
            records = stats.records,
            "monthly summary produced"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            profile = %ctx.profile,
            path = %ctx.path.display(),
            severity = ?severity,
            error = %error,
            "monthly summary failed"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            alert = true,
            profile = %ctx.profile,
            path = %ctx.path.display(),
            severity = ?severity,
            error = %error,
            "monthly summary failed"
        );
    }
}

/// Appends run events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: RunStats) {
        self.append_line(&format!(
            "{} ok profile={} path={} rows={} records={}",
            unix_ts(),
            ctx.profile,
            ctx.path.display(),
            stats.input_rows,
            stats.records
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} fail severity={:?} profile={} path={} err={}",
            unix_ts(),
            severity,
            ctx.profile,
            ctx.path.display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} profile={} path={} err={}",
            unix_ts(),
            severity,
            ctx.profile,
            ctx.path.display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
