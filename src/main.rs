use chrono::Local;
use clap::Parser;
use lib::config::{normalize_token, parse_optional_date, require_token, resolve_window};
use lib::structs::{DEFAULT_BASE_URL, DEFAULT_FILE_PREFIX, DEFAULT_STATION};
use lib::{
    AnnualSource, DatasetOutcome, DatasetReport, DatasetSelection, FetchConfig, Fetcher,
    Measurement, PipelineError, RunOptions, SimpleLogger, run,
};
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fetch NOAA CDO precipitation totals for one station",
    long_about = None
)]
struct Args {
    /// CDO API access token
    #[arg(long, env = "NOAA_CDO_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// First day to fetch, YYYY-MM-DD (default 1991-01-01)
    #[arg(long, env = "NOAA_START_DATE")]
    start_date: Option<String>,

    /// Last day to fetch, YYYY-MM-DD (default today)
    #[arg(long, env = "NOAA_END_DATE")]
    end_date: Option<String>,

    /// CDO station identifier
    #[arg(long, default_value = DEFAULT_STATION)]
    station: String,

    /// CDO v2 API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Directory the chart page loads its CSV files from
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,

    /// Output files are named <PREFIX>_monthly.csv and <PREFIX>_annual.csv
    #[arg(long, default_value = DEFAULT_FILE_PREFIX)]
    file_prefix: String,

    /// Datasets to produce
    #[arg(long, value_enum, default_value = "both")]
    dataset: DatasetSelection,

    /// Source of the annual totals
    #[arg(long, value_enum, default_value = "dataset")]
    annual_source: AnnualSource,

    /// Measurement to fetch
    #[arg(long, value_enum, default_value = "precipitation")]
    measurement: Measurement,

    /// Records per request
    #[arg(long, default_value_t = 1000)]
    page_size: u32,

    /// Attempts per page when the API answers 503
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Seconds to wait between 503 retries
    #[arg(long, default_value_t = 5)]
    retry_backoff_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Also write JSON snapshots next to the CSV files
    #[arg(long, default_value = "false")]
    json: bool,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,
}

fn main() -> ExitCode {
    if let Err(err) = log::set_logger(&LOGGER) {
        eprintln!("Failed to install logger: {}", err);
    }

    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }

    match execute(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Runs the pipeline; `Ok(false)` when at least one dataset failed.
fn execute(args: Args) -> Result<bool, PipelineError> {
    let total_start = Instant::now();
    println!("rainfetch: NOAA CDO precipitation totals");

    let token = normalize_token(args.token);
    require_token(token.as_deref())?;

    let today = Local::now().date_naive();
    let window = resolve_window(
        parse_optional_date(args.start_date.as_deref())?,
        parse_optional_date(args.end_date.as_deref())?,
        today,
    )?;
    debug!(
        "Station: {} | Window: {} | Base URL: {}",
        args.station, window, args.base_url
    );
    debug!(
        "Page size: {} | Attempts: {} | Backoff: {}s | Timeout: {}s",
        args.page_size, args.max_attempts, args.retry_backoff_secs, args.timeout_secs
    );

    let config = FetchConfig {
        base_url: args.base_url,
        token,
        page_size: args.page_size,
        max_attempts: args.max_attempts,
        retry_backoff: Duration::from_secs(args.retry_backoff_secs),
        request_timeout: Duration::from_secs(args.timeout_secs),
    };
    let fetcher = Fetcher::from_config(config)?;

    let options = RunOptions {
        station: args.station,
        measurement: args.measurement,
        window,
        datasets: args.dataset,
        annual_source: args.annual_source,
        output_dir: args.output_dir,
        file_prefix: args.file_prefix,
        write_json: args.json,
    };

    println!(
        "Fetching {} for {} ({})...",
        options.measurement.datatype_id(),
        options.station,
        options.window
    );
    let reports = run(&fetcher, &options)?;

    for report in &reports {
        match &report.outcome {
            DatasetOutcome::Written {
                path,
                rows,
                rejected,
            } => {
                println!(
                    "{}: wrote {} rows to {}",
                    report.dataset,
                    rows,
                    path.display()
                );
                if *rejected > 0 {
                    println!("  {} records excluded by data checks", rejected);
                }
            }
            DatasetOutcome::Empty => {
                println!("{}: no data returned, nothing written", report.dataset)
            }
            DatasetOutcome::AllRejected { rejected } => eprintln!(
                "{}: all {} records failed data checks, nothing written",
                report.dataset, rejected
            ),
            DatasetOutcome::Failed(err) => eprintln!("{}: FAILED: {}", report.dataset, err),
        }
    }

    println!("Completed in {:.2?}", total_start.elapsed());
    Ok(!reports.iter().any(DatasetReport::is_failure))
}
