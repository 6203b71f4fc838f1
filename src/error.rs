use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No CDO access token configured (set NOAA_CDO_TOKEN or pass --token)")]
    MissingToken,
    #[error("Invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("Invalid query window: start {start} is after end {end}")]
    InvalidWindow { start: String, end: String },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("HTTP transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Remote service failure: HTTP {status}: {body}")]
    Remote { status: StatusCode, body: String },
    #[error("Remote service unavailable (HTTP 503) after {attempts} attempts at offset {offset}")]
    ServiceUnavailable { attempts: u32, offset: u64 },
    #[error("Data Quality Error: {0}")]
    DataQuality(String),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
