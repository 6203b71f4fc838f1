//! Header names shared with the chart page.
//!
//! The page accepts a fixed set of aliases per field; the writers emit the
//! canonical names and the reader maps any alias back to its field.

use crate::error::{PipelineError, Result};
use crate::structs::Granularity;
use csv::StringRecord;

pub const YEAR_HEADER: &str = "Year";
pub const MONTH_HEADER: &str = "Month";
pub const PRECIPITATION_HEADER: &str = "Precipitation";
pub const STATION_HEADER: &str = "Station";
pub const UNITS_HEADER: &str = "Units";
pub const RECORDS_HEADER: &str = "Records";

const YEAR_ALIASES: &[&str] = &[YEAR_HEADER, "yr", "date"];
const MONTH_ALIASES: &[&str] = &[MONTH_HEADER, "mon", "month_abbr"];
const PRECIPITATION_ALIASES: &[&str] = &[
    PRECIPITATION_HEADER,
    "precip",
    "prcp",
    "value",
    "total",
    "precip_in",
];

/// Column positions of the canonical fields within a CSV header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub year: usize,
    pub month: Option<usize>,
    pub precipitation: usize,
}

/// Maps a header row onto canonical fields, case-insensitively.
///
/// A month column is required for monthly files only. Fails with
/// `DataQuality` naming the first field none of whose aliases is present.
pub fn resolve_columns(headers: &StringRecord, granularity: Granularity) -> Result<ColumnMap> {
    let year = find_alias(headers, YEAR_ALIASES).ok_or_else(|| missing("year", YEAR_ALIASES))?;
    let precipitation = find_alias(headers, PRECIPITATION_ALIASES)
        .ok_or_else(|| missing("precipitation", PRECIPITATION_ALIASES))?;
    let month = match granularity {
        Granularity::Monthly => Some(
            find_alias(headers, MONTH_ALIASES).ok_or_else(|| missing("month", MONTH_ALIASES))?,
        ),
        Granularity::Annual => find_alias(headers, MONTH_ALIASES),
    };

    Ok(ColumnMap {
        year,
        month,
        precipitation,
    })
}

fn find_alias(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.trim().trim_start_matches('\u{feff}');
        aliases.iter().any(|alias| alias.eq_ignore_ascii_case(header))
    })
}

fn missing(field: &str, aliases: &[&str]) -> PipelineError {
    PipelineError::DataQuality(format!(
        "no {} column found (expected one of: {})",
        field,
        aliases.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_headers_resolve() {
        let headers = StringRecord::from(vec![
            YEAR_HEADER,
            MONTH_HEADER,
            PRECIPITATION_HEADER,
            STATION_HEADER,
            UNITS_HEADER,
            RECORDS_HEADER,
        ]);
        let map = resolve_columns(&headers, Granularity::Monthly).unwrap();
        assert_eq!(
            map,
            ColumnMap {
                year: 0,
                month: Some(1),
                precipitation: 2
            }
        );
    }

    #[test]
    fn aliases_match_regardless_of_case() {
        let headers = StringRecord::from(vec!["PRCP", "\u{feff}DATE"]);
        let map = resolve_columns(&headers, Granularity::Annual).unwrap();
        assert_eq!(map.year, 1);
        assert_eq!(map.precipitation, 0);
        assert_eq!(map.month, None);

        let headers = StringRecord::from(vec!["yr", "MON", " Precip_In "]);
        let map = resolve_columns(&headers, Granularity::Monthly).unwrap();
        assert_eq!(map.month, Some(1));
        assert_eq!(map.precipitation, 2);
    }

    #[test]
    fn unknown_headers_are_a_data_quality_error() {
        let headers = StringRecord::from(vec!["Year", "rainfall"]);
        let err = resolve_columns(&headers, Granularity::Annual).unwrap_err();
        match err {
            PipelineError::DataQuality(message) => assert!(message.contains("precipitation")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn monthly_files_need_a_month_column() {
        let headers = StringRecord::from(vec!["Year", "Precipitation"]);
        assert!(resolve_columns(&headers, Granularity::Annual).is_ok());
        assert!(matches!(
            resolve_columns(&headers, Granularity::Monthly),
            Err(PipelineError::DataQuality(_))
        ));
    }
}
