use crate::config::require_token;
use crate::error::{PipelineError, Result};
use crate::structs::{DatasetKind, FetchConfig, Measurement, Observation};
use crate::window::QueryWindow;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::thread;
use std::time::Duration;

const USER_AGENT: &str = concat!("rainfetch/", env!("CARGO_PKG_VERSION"));

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// A single blocking GET against the CDO API.
///
/// Implementations only report what came back over the wire; status handling
/// and retries live in [`Fetcher`].
pub trait Transport {
    fn get(&self, url: &str, token: &str, query: &[(&str, String)]) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, token: &str, query: &[(&str, String)]) -> Result<HttpResponse> {
        (**self).get(url, token, query)
    }
}

/// Production transport backed by a blocking `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(PipelineError::HttpClient)?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, token: &str, query: &[(&str, String)]) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .header("token", token)
            .query(query)
            .send()
            .map_err(|source| PipelineError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response.text().map_err(|source| PipelineError::Transport {
            url: url.to_string(),
            source,
        })?;
        Ok(HttpResponse { status, body })
    }
}

// CDO answers a query with no matches with `{}`, hence the defaults.
#[derive(Debug, Default, Deserialize)]
struct CdoPage {
    #[serde(default)]
    metadata: Option<CdoMetadata>,
    #[serde(default)]
    results: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct CdoMetadata {
    resultset: ResultSet,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    count: u64,
}

impl CdoPage {
    fn parse(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(body)?)
    }

    fn total_count(&self) -> u64 {
        self.metadata.as_ref().map_or(0, |m| m.resultset.count)
    }
}

/// Paginating, retrying client for the CDO `/data` endpoint.
pub struct Fetcher<T: Transport> {
    config: FetchConfig,
    transport: T,
}

impl Fetcher<ReqwestTransport> {
    /// Builds a fetcher with the production HTTP transport.
    pub fn from_config(config: FetchConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn new(config: FetchConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Retrieves every `measurement` record of `dataset` for `station` in
    /// `[start, end]`.
    ///
    /// Windows wider than the dataset allows are queried piecewise and the
    /// results concatenated chronologically. Each piece is paged through
    /// sequentially; an HTTP 503 is retried on the same page, any other
    /// failure ends the fetch.
    ///
    /// # Errors
    ///
    /// - `MissingToken` when no token is configured, before any request
    /// - `InvalidWindow` when `start > end`
    /// - `ServiceUnavailable` when a page keeps answering 503
    /// - `Remote` for any other non-success status
    /// - `Transport`/`Json` for network or body failures
    pub fn fetch(
        &self,
        dataset: DatasetKind,
        measurement: Measurement,
        station: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>> {
        let token = require_token(self.config.token.as_deref())?;
        let window = QueryWindow::new(start, end)?;

        let chunks = window.split(dataset.max_span_years());
        if chunks.len() > 1 {
            debug!(
                "Splitting {} query {} into {} windows",
                dataset,
                window,
                chunks.len()
            );
        }

        let mut observations = Vec::new();
        for chunk in &chunks {
            let mut found = self.fetch_window(token, dataset, measurement, station, chunk)?;
            debug!("Window {} returned {} records", chunk, found.len());
            observations.append(&mut found);
        }

        info!(
            "Fetched {} {} {} records for {} ({})",
            observations.len(),
            dataset,
            measurement.datatype_id(),
            station,
            window
        );
        Ok(observations)
    }

    fn fetch_window(
        &self,
        token: &str,
        dataset: DatasetKind,
        measurement: Measurement,
        station: &str,
        window: &QueryWindow,
    ) -> Result<Vec<Observation>> {
        let url = format!("{}/data", self.config.base_url.trim_end_matches('/'));
        let limit = u64::from(self.config.page_size.max(1));
        let mut offset: u64 = 1;
        let mut observations = Vec::new();

        loop {
            let query = [
                ("datasetid", dataset.dataset_id().to_string()),
                ("datatypeid", measurement.datatype_id().to_string()),
                ("stationid", station.to_string()),
                ("startdate", window.start().to_string()),
                ("enddate", window.end().to_string()),
                ("units", "standard".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ];

            let page = self.fetch_page(&url, token, &query, offset)?;
            let count = page.total_count();
            let received = page.results.len();
            observations.extend(page.results);
            debug!(
                "{} offset {}: {} records (resultset count {})",
                dataset, offset, received, count
            );

            if offset + limit > count {
                break;
            }
            if received == 0 {
                warn!(
                    "{} page at offset {} was empty although {} records were reported, stopping",
                    dataset, offset, count
                );
                break;
            }
            offset += limit;
        }

        Ok(observations)
    }

    fn fetch_page(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, String)],
        offset: u64,
    ) -> Result<CdoPage> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let response = self.transport.get(url, token, query)?;

            if response.status.is_success() {
                return CdoPage::parse(&response.body);
            }

            if response.status != StatusCode::SERVICE_UNAVAILABLE {
                warn!(
                    "HTTP {} from {} at offset {}: {}",
                    response.status, url, offset, response.body
                );
                return Err(PipelineError::Remote {
                    status: response.status,
                    body: response.body,
                });
            }

            if attempt >= max_attempts {
                return Err(PipelineError::ServiceUnavailable {
                    attempts: attempt,
                    offset,
                });
            }
            warn!(
                "HTTP 503 at offset {} (attempt {}/{}), retrying in {:?}",
                offset, attempt, max_attempts, self.config.retry_backoff
            );
            thread::sleep(self.config.retry_backoff);
        }
    }
}
