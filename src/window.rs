use crate::error::{PipelineError, Result};
use chrono::{Months, NaiveDate};
use std::fmt;

/// Inclusive `[start, end]` date range bounding one CDO query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl QueryWindow {
    /// Builds a window, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Splits the window into consecutive chronological sub-windows, none
    /// spanning more than `max_span_years`. Sub-windows are contiguous and do
    /// not overlap; a window already within the limit is returned as is.
    pub fn split(&self, max_span_years: u32) -> Vec<QueryWindow> {
        let span = Months::new(max_span_years.max(1) * 12);
        let mut windows = Vec::new();
        let mut chunk_start = self.start;

        loop {
            let chunk_end = chunk_start
                .checked_add_months(span)
                .and_then(|d| d.pred_opt())
                .map_or(self.end, |d| d.min(self.end));
            windows.push(QueryWindow {
                start: chunk_start,
                end: chunk_end,
            });

            match chunk_end.succ_opt() {
                Some(next) if chunk_end < self.end => chunk_start = next,
                _ => break,
            }
        }

        windows
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
