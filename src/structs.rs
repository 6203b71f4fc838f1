use log::{Log, Metadata, Record as LogRecord};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.ncei.noaa.gov/cdo-web/api/v2";
pub const DEFAULT_STATION: &str = "GHCND:USW00024233";
/// Stem of the output file names the chart page loads.
pub const DEFAULT_FILE_PREFIX: &str = "seattle_rain";

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Simple logger implementation writing to stderr
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &LogRecord) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// One record of the CDO `/data` endpoint.
///
/// `value` stays raw JSON so that aggregation can tell a null measurement
/// (counts as zero) apart from a malformed one (rejected). `date` and
/// `datatype` tolerate null, absent or non-string JSON so that one bad record
/// is rejected during aggregation instead of failing the whole page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub datatype: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
}

/// Keeps strings as-is, maps null to `None` and any other JSON to its text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// CDO summary datasets the pipeline knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Global Summary of the Month
    Monthly,
    /// Global Summary of the Year
    Annual,
}

impl DatasetKind {
    pub fn dataset_id(&self) -> &'static str {
        match self {
            DatasetKind::Monthly => "GSOM",
            DatasetKind::Annual => "GSOY",
        }
    }

    /// Widest window CDO accepts for one query against this dataset.
    pub fn max_span_years(&self) -> u32 {
        match self {
            DatasetKind::Monthly | DatasetKind::Annual => 10,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            DatasetKind::Monthly => Granularity::Monthly,
            DatasetKind::Annual => Granularity::Annual,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Monthly => write!(f, "monthly"),
            DatasetKind::Annual => write!(f, "annual"),
        }
    }
}

/// Measurement category requested from CDO
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Measurement {
    Precipitation,
}

impl Measurement {
    pub fn datatype_id(&self) -> &'static str {
        match self {
            Measurement::Precipitation => "PRCP",
        }
    }

    /// Unit label for `units=standard` responses
    pub fn unit_label(&self) -> &'static str {
        match self {
            Measurement::Precipitation => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Monthly,
    Annual,
}

/// Grouping key of an aggregate. `month` is `None` for annual totals, so the
/// derived ordering is year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    pub year: i32,
    pub month: Option<u32>,
}

/// Summed measurement for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Total {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub precipitation: f64,
    pub records: u32,
}

impl Total {
    pub fn key(&self) -> PeriodKey {
        PeriodKey {
            year: self.year,
            month: self.month,
        }
    }

    pub fn month_abbreviation(&self) -> Option<&'static str> {
        self.month
            .and_then(|m| MONTH_ABBREVIATIONS.get((m as usize).checked_sub(1)?))
            .copied()
    }
}

/// An observation excluded from aggregation because of bad data
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub date: Option<String>,
    pub reason: String,
}

/// Output of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub totals: Vec<Total>,
    pub rejected: Vec<Rejection>,
}

/// Connection and paging settings handed to the fetcher at construction
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub page_size: u32,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            page_size: 1000,
            max_attempts: 3,
            retry_backoff: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Where annual totals come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnnualSource {
    /// Query the GSOY dataset
    Dataset,
    /// Sum the monthly records per year
    Monthly,
}

/// Which datasets a run should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DatasetSelection {
    Monthly,
    Annual,
    Both,
}

impl DatasetSelection {
    pub fn includes(&self, kind: DatasetKind) -> bool {
        matches!(
            (self, kind),
            (DatasetSelection::Both, _)
                | (DatasetSelection::Monthly, DatasetKind::Monthly)
                | (DatasetSelection::Annual, DatasetKind::Annual)
        )
    }
}
