//! Scripted stand-in for the CDO API used by unit tests.

use crate::error::{PipelineError, Result};
use crate::fetch::{HttpResponse, Transport};
use reqwest::StatusCode;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Replays canned responses in order and records every request it sees.
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<HttpResponse>>>,
    requests: RefCell<Vec<Vec<(String, String)>>>,
    tokens: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self::with_outcomes(responses.into_iter().map(Ok).collect())
    }

    /// Like [`ScriptedTransport::new`], but steps may also be transport failures.
    pub fn with_outcomes(outcomes: Vec<Result<HttpResponse>>) -> Self {
        Self {
            responses: RefCell::new(outcomes.into()),
            requests: RefCell::new(Vec::new()),
            tokens: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.borrow().clone()
    }

    /// Value of query parameter `name` for every request, in order.
    pub fn params(&self, name: &str) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|q| {
                q.iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            })
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, _url: &str, token: &str, query: &[(&str, String)]) -> Result<HttpResponse> {
        self.tokens.borrow_mut().push(token.to_string());
        self.requests
            .borrow_mut()
            .push(query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect());
        self.responses
            .borrow_mut()
            .pop_front()
            .expect("more requests than scripted responses")
    }
}

pub fn ok(body: String) -> HttpResponse {
    HttpResponse {
        status: StatusCode::OK,
        body,
    }
}

pub fn status(code: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status: StatusCode::from_u16(code).unwrap(),
        body: body.to_string(),
    }
}

/// A network-level failure, as the production transport reports a refused
/// connection or timeout.
pub fn connection_failure(url: &str) -> PipelineError {
    let source = reqwest::blocking::Client::new()
        .get("not a url")
        .build()
        .expect_err("an unparseable url cannot build a request");
    PipelineError::Transport {
        url: url.to_string(),
        source,
    }
}

/// A CDO page body: `len` records valued `first..first + len`, all dated
/// `date`, inside a resultset of `count`.
pub fn page_on(date: &str, first: usize, len: usize, count: usize) -> String {
    let results: Vec<serde_json::Value> = (first..first + len)
        .map(|i| {
            serde_json::json!({
                "date": date,
                "datatype": "PRCP",
                "station": "GHCND:USW00024233",
                "attributes": ",,,",
                "value": i as f64,
            })
        })
        .collect();
    serde_json::json!({
        "metadata": {"resultset": {"offset": first + 1, "count": count, "limit": 1000}},
        "results": results,
    })
    .to_string()
}

pub fn page(first: usize, len: usize, count: usize) -> String {
    page_on("2020-01-01T00:00:00", first, len, count)
}

/// A body holding exactly the given `(date, value)` records.
pub fn records(rows: &[(&str, f64)]) -> String {
    let results: Vec<serde_json::Value> = rows
        .iter()
        .map(|(date, value)| {
            serde_json::json!({"date": date, "datatype": "PRCP", "value": value})
        })
        .collect();
    serde_json::json!({
        "metadata": {"resultset": {"offset": 1, "count": rows.len(), "limit": 1000}},
        "results": results,
    })
    .to_string()
}
