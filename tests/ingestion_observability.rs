use std::fs;
use std::sync::{Arc, Mutex};

use landings_monthly::ingestion::{IngestionContext, IngestionObserver, IngestionSeverity, RunStats};
use landings_monthly::pipeline::{run_bytes, run_file, FormatProfile, PipelineOptions};
use landings_monthly::{IngestionError, PipelineStage};

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<RunStats>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
    profiles: Mutex<Vec<String>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: RunStats) {
        self.profiles.lock().unwrap().push(ctx.profile.clone());
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn options(obs: &Arc<RecordingObserver>, threshold: IngestionSeverity) -> PipelineOptions {
    PipelineOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: threshold,
    }
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = options(&obs, IngestionSeverity::Critical);

    // Missing file -> load-stage read error -> Critical
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does_not_exist.csv");
    let err = run_file(&missing, &FormatProfile::default(), &opts).unwrap_err();
    assert!(matches!(err, IngestionError::InputIo { .. }));
    assert_eq!(err.path(), Some(missing.as_path()));
    assert_eq!(err.stage(), Some(PipelineStage::Load));
    let message = err.to_string();
    assert!(message.contains("does_not_exist.csv"), "{message}");
    assert!(message.contains("load"), "{message}");

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_non_critical_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = options(&obs, IngestionSeverity::Critical);

    // No quantity column -> Error severity -> no alert
    let text = "landingsdato;dokumenttype\n2024-01-01;0\n";
    let _ = run_bytes(text.as_bytes(), "no_quantity.csv", &FormatProfile::default(), &opts).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn lower_threshold_alerts_on_domain_errors() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = options(&obs, IngestionSeverity::Error);

    let text = "landingsdato;rundvekt\n2024-01-01;tre\n";
    let err = run_bytes(text.as_bytes(), "bad_number.csv", &FormatProfile::default(), &opts).unwrap_err();
    assert!(matches!(err, IngestionError::NumericParse { .. }));

    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Error]);
}

#[test]
fn observer_receives_run_stats_on_success() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = options(&obs, IngestionSeverity::Critical);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("landings.csv");
    fs::write(
        &path,
        "Landingsdato;Dokumenttype;Rundvekt\n2024-03-01;0;5\n2024-03-02;1;6\nugyldig;0;7\n",
    )
    .unwrap();

    run_file(&path, &FormatProfile::domestic_landings(), &opts).unwrap();

    let stats = obs.successes.lock().unwrap().clone();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].input_rows, 3);
    assert_eq!(stats[0].dropped_dates, 1);
    assert_eq!(stats[0].dropped_status, 1);
    assert_eq!(stats[0].records, 1);
    assert_eq!(*obs.profiles.lock().unwrap(), vec!["domestic".to_string()]);
    assert!(obs.failures.lock().unwrap().is_empty());
}
