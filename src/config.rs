//! Defaulting rules for run configuration, kept free of process state so
//! they can be exercised without touching the environment.

use crate::error::{PipelineError, Result};
use crate::window::QueryWindow;
use chrono::NaiveDate;

const DEFAULT_START_YEAR: i32 = 1991;

/// First day of the default history window.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(DEFAULT_START_YEAR, 1, 1).unwrap_or_default()
}

/// Last day of the default history window: the caller's notion of today.
pub fn default_end_date(today: NaiveDate) -> NaiveDate {
    today
}

/// Resolves optional overrides into a validated query window.
pub fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<QueryWindow> {
    let start = start.unwrap_or_else(default_start_date);
    let end = end.unwrap_or_else(|| default_end_date(today));
    QueryWindow::new(start, end)
}

/// Parses an optional `YYYY-MM-DD` override; blank counts as unset.
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| PipelineError::InvalidDate {
                value: value.to_string(),
            }),
    }
}

/// Treats a blank token the same as an absent one.
pub fn normalize_token(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Fails with [`PipelineError::MissingToken`] unless a usable token is set.
pub fn require_token(token: Option<&str>) -> Result<&str> {
    match token.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(PipelineError::MissingToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_cover_1991_through_today() {
        let today = date(2024, 7, 4);
        let window = resolve_window(None, None, today).unwrap();
        assert_eq!(window.start(), date(1991, 1, 1));
        assert_eq!(window.end(), today);
    }

    #[test]
    fn overrides_take_precedence() {
        let window =
            resolve_window(Some(date(2000, 1, 1)), Some(date(2001, 6, 30)), date(2024, 1, 1))
                .unwrap();
        assert_eq!(window.start(), date(2000, 1, 1));
        assert_eq!(window.end(), date(2001, 6, 30));
    }

    #[test]
    fn start_after_default_end_is_rejected() {
        let err = resolve_window(Some(date(2030, 1, 1)), None, date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWindow { .. }));
    }

    #[test]
    fn date_overrides_parse_and_blank_is_unset() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert_eq!(parse_optional_date(Some(" ")).unwrap(), None);
        assert_eq!(
            parse_optional_date(Some("2005-06-07")).unwrap(),
            Some(date(2005, 6, 7))
        );
        assert!(matches!(
            parse_optional_date(Some("06/07/2005")),
            Err(PipelineError::InvalidDate { .. })
        ));
    }

    #[test]
    fn blank_tokens_are_missing() {
        assert_eq!(normalize_token(Some("   ".to_string())), None);
        assert_eq!(normalize_token(None), None);
        assert_eq!(normalize_token(Some(" abc ".to_string())), Some("abc".to_string()));
        assert!(matches!(require_token(Some("")), Err(PipelineError::MissingToken)));
        assert!(matches!(require_token(None), Err(PipelineError::MissingToken)));
        assert_eq!(require_token(Some("abc")).unwrap(), "abc");
    }
}
