use crate::structs::{
    Aggregation, Granularity, Measurement, Observation, PeriodKey, Rejection, Total,
};
use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rolls observations up into per-period totals.
///
/// Each observation's date (time-of-day suffix discarded) is mapped to its
/// year, or `(year, month)` for monthly granularity, and values sharing a key
/// are summed. Missing or null values contribute zero. Records with an
/// unparseable date or a non-numeric value are excluded from every group and
/// reported in [`Aggregation::rejected`].
///
/// # Arguments
///
/// * `observations` - Records as returned by the fetcher
/// * `granularity` - Whether to group by month or by year
///
/// # Returns
///
/// Totals sorted ascending by year, then month. Values within a group are
/// summed in sorted order, so any permutation of the input produces
/// bit-identical totals.
pub fn aggregate(observations: &[Observation], granularity: Granularity) -> Aggregation {
    let mut grouped: HashMap<PeriodKey, Vec<f64>> = HashMap::new();
    let mut rejected = Vec::new();

    for (index, observation) in observations.iter().enumerate() {
        let parsed = parse_date(observation.date.as_deref())
            .and_then(|date| parse_value(observation.value.as_ref()).map(|value| (date, value)));

        match parsed {
            Ok((date, value)) => {
                let key = PeriodKey {
                    year: date.year(),
                    month: match granularity {
                        Granularity::Monthly => Some(date.month()),
                        Granularity::Annual => None,
                    },
                };
                grouped.entry(key).or_default().push(value);
            }
            Err(reason) => {
                warn!(
                    "Skipping record {} ({}): {}",
                    index,
                    observation.date.as_deref().unwrap_or("no date"),
                    reason
                );
                rejected.push(Rejection {
                    index,
                    date: observation.date.clone(),
                    reason,
                });
            }
        }
    }

    debug!(
        "Grouped {} records into {} periods ({} rejected)",
        observations.len() - rejected.len(),
        grouped.len(),
        rejected.len()
    );

    let mut totals: Vec<Total> = grouped
        .into_iter()
        .map(|(key, mut values)| {
            values.sort_by(f64::total_cmp);
            Total {
                year: key.year,
                month: key.month,
                precipitation: values.iter().fold(0.0, |acc, v| acc + v),
                records: values.len() as u32,
            }
        })
        .collect();
    totals.sort_by_key(Total::key);

    Aggregation { totals, rejected }
}

/// Drops observations whose datatype is not `measurement`.
///
/// Records without a datatype are kept: the query already filtered on it.
pub fn retain_measurement(
    observations: Vec<Observation>,
    measurement: Measurement,
) -> Vec<Observation> {
    let before = observations.len();
    let kept: Vec<Observation> = observations
        .into_iter()
        .filter(|o| {
            o.datatype
                .as_deref()
                .is_none_or(|d| d.eq_ignore_ascii_case(measurement.datatype_id()))
        })
        .collect();
    if kept.len() != before {
        debug!(
            "Dropped {} records not of datatype {}",
            before - kept.len(),
            measurement.datatype_id()
        );
    }
    kept
}

/// Parses `YYYY-MM-DD`, ignoring any `T...` or space-separated time suffix.
fn parse_date(raw: Option<&str>) -> Result<NaiveDate, String> {
    let raw = raw.ok_or_else(|| "missing date".to_string())?;
    let day = raw.trim().split(['T', ' ']).next().unwrap_or_default();
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|e| format!("unparseable date: {}", e))
}

/// Absent, null and blank values count as zero; anything else must be a finite number.
fn parse_value(raw: Option<&Value>) -> Result<f64, String> {
    let value = match raw {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(format!(
            "non-numeric value: {}",
            raw.map_or(Value::Null, Value::clone)
        )),
    }
}
