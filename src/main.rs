use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use landings_monthly::compare::{compare, summarize_year};
use landings_monthly::fetch::{FetchOptions, RemoteFetcher};
use landings_monthly::ingestion::{
    read_monthly_parquet, CompositeObserver, FileObserver, IngestionObserver, IngestionSeverity, TracingObserver,
};
use landings_monthly::output::{write_csv, write_per_year, OutputFormat};
use landings_monthly::pipeline::{run_bytes, run_file, run_files, FormatProfile, PipelineOptions};
use landings_monthly::processing::aggregate::aggregate_records;
use landings_monthly::types::MonthlyRecord;

#[derive(Parser)]
#[command(name = "landings-monthly", version, about = "Monthly summaries of fishery landing exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatArg,

    /// Append run outcomes to this file.
    #[arg(long = "event-log", value_name = "PATH", global = true)]
    event_log: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(clap::Args)]
struct ProfileArgs {
    /// Built-in profile: domestic, foreign or monthly-wide.
    /// Defaults to domestic for `local` and monthly-wide for `compare`.
    #[arg(long)]
    profile: Option<String>,

    /// JSON profile file; overrides --profile.
    #[arg(long = "profile-file", value_name = "PATH")]
    profile_file: Option<PathBuf>,
}

impl ProfileArgs {
    fn resolve(&self, default: &str) -> Result<FormatProfile> {
        if let Some(path) = &self.profile_file {
            return FormatProfile::from_json_path(path)
                .with_context(|| format!("loading profile {}", path.display()));
        }
        let name = self.profile.as_deref().unwrap_or(default);
        match FormatProfile::preset(name) {
            Some(p) => Ok(p),
            None => bail!("unknown profile '{name}'"),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Summarize local export files (paths or glob patterns).
    Local {
        #[arg(required = true)]
        inputs: Vec<String>,
        #[command(flatten)]
        profile: ProfileArgs,
        #[arg(long = "out-dir", default_value = "data/processed")]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value = "parquet")]
        format: FormatArg,
    },
    /// Download and summarize yearly register exports.
    Remote {
        #[arg(required = true)]
        years: Vec<i32>,
        #[arg(long = "url-template")]
        url_template: Option<String>,
        /// Request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
        #[arg(long = "out-dir", default_value = "data/processed")]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value = "parquet")]
        format: FormatArg,
    },
    /// Compare one year's total quantity between two files (exports or written `.parquet` summaries).
    Compare {
        file1: PathBuf,
        file2: PathBuf,
        #[arg(long, default_value = "File 1")]
        label1: String,
        #[arg(long, default_value = "File 2")]
        label2: String,
        /// Compare this year instead of the latest one.
        #[arg(long)]
        year: Option<i32>,
        /// Save the comparison as JSON.
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Convert every `monthly_*.parquet` in a directory to CSV next to it.
    Convert {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);
    let options = pipeline_options(cli.event_log.as_deref());

    match cli.command {
        Command::Local {
            inputs,
            profile,
            out_dir,
            format,
        } => run_local(&inputs, &profile.resolve("domestic")?, &options, &out_dir, format.into()),
        Command::Remote {
            years,
            url_template,
            timeout,
            out_dir,
            format,
        } => {
            let mut fetch = FetchOptions::default();
            if let Some(t) = url_template {
                fetch.url_template = t;
            }
            if let Some(t) = timeout {
                fetch.timeout_secs = t;
            }
            run_remote(&years, fetch, &options, &out_dir, format.into())
        }
        Command::Compare {
            file1,
            file2,
            label1,
            label2,
            year,
            out,
            profile,
        } => {
            let profile = profile.resolve("monthly-wide")?;
            let a = summarize_year(label1, &file1, &load_summary(&file1, &profile, &options)?, year)?;
            let b = summarize_year(label2, &file2, &load_summary(&file2, &profile, &options)?, year)?;
            let result = compare(a, b);

            println!("{} ({}) - year {}: {:.3} t", result.first.label, file1.display(), result.first.year, result.first.total_tonnes);
            println!("{} ({}) - year {}: {:.3} t", result.second.label, file2.display(), result.second.year, result.second.total_tonnes);
            println!("difference (file1 - file2): {:.3} t", result.difference_tonnes);
            println!("absolute difference: {:.3} t", result.abs_difference_tonnes);
            if let Some(p) = result.pct_of_second {
                println!("difference as % of {}: {p:.2}%", result.second.label);
            }
            if let Some(p) = result.pct_of_first {
                println!("difference as % of {}: {p:.2}%", result.first.label);
            }
            if let Some(out) = out {
                fs::write(&out, serde_json::to_string_pretty(&result)?)?;
                tracing::info!(path = %out.display(), "saved comparison");
            }
            Ok(())
        }
        Command::Convert { dir } => convert(&dir),
    }
}

fn init_logging(verbose: u8, format: LogFormatArg) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormatArg::Pretty => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        LogFormatArg::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
    }
}

fn pipeline_options(event_log: Option<&Path>) -> PipelineOptions {
    let mut observers: Vec<Arc<dyn IngestionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = event_log {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    PipelineOptions {
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        alert_at_or_above: IngestionSeverity::Critical,
    }
}

fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        let before = paths.len();
        for entry in glob::glob(input).with_context(|| format!("bad pattern '{input}'"))? {
            paths.push(entry?);
        }
        if paths.len() == before {
            paths.push(PathBuf::from(input));
        }
    }
    Ok(paths)
}

fn run_local(
    inputs: &[String],
    profile: &FormatProfile,
    options: &PipelineOptions,
    out_dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    let paths = expand_inputs(inputs)?;
    let mut records: Vec<MonthlyRecord> = Vec::new();
    let mut failed = 0usize;
    for (path, result) in paths.iter().zip(run_files(&paths, profile, options)) {
        match result {
            Ok(summary) => records.extend(summary.records),
            Err(e) => {
                failed += 1;
                tracing::error!(path = %path.display(), error = %e, "skipping file");
            }
        }
    }
    if failed == paths.len() {
        bail!("no input could be summarized");
    }
    save(out_dir, &aggregate_records(&records), format)
}

fn run_remote(
    years: &[i32],
    fetch: FetchOptions,
    options: &PipelineOptions,
    out_dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    let fetcher = RemoteFetcher::new(fetch)?;
    let profile = FormatProfile::domestic_landings();
    let mut records: Vec<MonthlyRecord> = Vec::new();
    for &year in years {
        let file = fetcher.fetch_year(year).with_context(|| format!("fetching {year}"))?;
        let summary = run_bytes(&file.bytes, &file.url, &profile, options)?;
        records.extend(summary.records);
    }
    save(out_dir, &aggregate_records(&records), format)
}

fn save(out_dir: &Path, records: &[MonthlyRecord], format: OutputFormat) -> Result<()> {
    match write_per_year(out_dir, records, format) {
        Ok(_) => Ok(()),
        Err(e) if format == OutputFormat::Parquet => {
            tracing::warn!(error = %e, "parquet write failed, falling back to csv");
            write_per_year(out_dir, records, OutputFormat::Csv)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn load_summary(path: &Path, profile: &FormatProfile, options: &PipelineOptions) -> Result<Vec<MonthlyRecord>> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }
    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        return Ok(read_monthly_parquet(path)?);
    }
    Ok(run_file(path, profile, options)?.records)
}

fn convert(dir: &Path) -> Result<()> {
    let pattern = dir.join("monthly_*.parquet");
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)?.collect::<Result<_, _>>()?;
    files.sort();
    if files.is_empty() {
        println!("no files matching {pattern}");
        return Ok(());
    }
    for f in files {
        let records = match read_monthly_parquet(&f) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(path = %f.display(), error = %e, "failed to read");
                continue;
            }
        };
        let out = f.with_extension("csv");
        write_csv(&out, &records)?;
        println!("saved csv: {}", out.display());
    }
    Ok(())
}
