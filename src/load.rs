use crate::error::{PipelineError, Result};
use crate::headers::{
    MONTH_HEADER, PRECIPITATION_HEADER, RECORDS_HEADER, STATION_HEADER, UNITS_HEADER,
    YEAR_HEADER, resolve_columns,
};
use crate::structs::{DatasetKind, Granularity, MONTH_ABBREVIATIONS, Total};
use csv::{Reader, Writer};
use std::{fs::File, path::Path};

/// File name of a dataset's output, e.g. `seattle_rain_monthly.csv` for
/// prefix `seattle_rain`.
pub fn output_file_name(prefix: &str, dataset: DatasetKind, extension: &str) -> String {
    format!("{}_{}.{}", prefix, dataset, extension)
}

/// Writes period totals to a CSV file the chart page can load.
///
/// Monthly files carry `Year,Month,...` with the month as a three-letter
/// abbreviation; annual files omit the month column. Totals are written with
/// two decimals in the order given.
///
/// # Arguments
/// * `results` - Totals, already sorted ascending by period
/// * `granularity` - Selects the monthly or annual column layout
/// * `station` - Station identifier written to the metadata column
/// * `units` - Unit label written to the metadata column
/// * `output_path` - Path where the CSV file will be created
///
/// # Errors
/// Returns error if the file cannot be created or written to.
pub fn write_csv(
    results: &[Total],
    granularity: Granularity,
    station: &str,
    units: &str,
    output_path: &Path,
) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    match granularity {
        Granularity::Monthly => writer.write_record([
            YEAR_HEADER,
            MONTH_HEADER,
            PRECIPITATION_HEADER,
            STATION_HEADER,
            UNITS_HEADER,
            RECORDS_HEADER,
        ])?,
        Granularity::Annual => writer.write_record([
            YEAR_HEADER,
            PRECIPITATION_HEADER,
            STATION_HEADER,
            UNITS_HEADER,
            RECORDS_HEADER,
        ])?,
    }

    for total in results {
        let mut row = vec![total.year.to_string()];
        if granularity == Granularity::Monthly {
            let month = total.month_abbreviation().ok_or_else(|| {
                PipelineError::DataQuality(format!(
                    "monthly total for {} has no valid month ({:?})",
                    total.year, total.month
                ))
            })?;
            row.push(month.to_string());
        }
        row.extend([
            format!("{:.2}", total.precipitation),
            station.to_string(),
            units.to_string(),
            total.records.to_string(),
        ]);
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes period totals to a pretty-formatted JSON file.
///
/// # Errors
/// Returns error if file cannot be created or serialization fails.
pub fn write_json(results: &[Total], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}

/// Loads a totals CSV the way the chart page does, accepting any recognized
/// header alias.
///
/// Month cells may be abbreviations (`Jan`), full names or numbers `1..=12`.
/// Year cells may be a bare year or an ISO date. A row that cannot be
/// interpreted fails the load with `DataQuality` naming the row.
///
/// The `Records` metadata column is not part of the alias contract and is
/// read back as zero.
pub fn read_totals_csv(path: &Path, granularity: Granularity) -> Result<Vec<Total>> {
    let mut reader = Reader::from_path(path)?;
    let columns = resolve_columns(reader.headers()?, granularity)?;

    let mut totals = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let line = row + 2;
        let cell = |index: usize| record.get(index).unwrap_or_default().trim();

        let year = parse_year(cell(columns.year)).ok_or_else(|| {
            PipelineError::DataQuality(format!("line {}: bad year {:?}", line, cell(columns.year)))
        })?;
        let month = match (granularity, columns.month) {
            (Granularity::Monthly, Some(index)) => {
                Some(parse_month(cell(index)).ok_or_else(|| {
                    PipelineError::DataQuality(format!(
                        "line {}: bad month {:?}",
                        line,
                        cell(index)
                    ))
                })?)
            }
            _ => None,
        };
        let precipitation = match cell(columns.precipitation) {
            "" => 0.0,
            raw => raw.parse::<f64>().map_err(|_| {
                PipelineError::DataQuality(format!("line {}: bad precipitation {:?}", line, raw))
            })?,
        };

        totals.push(Total {
            year,
            month,
            precipitation,
            records: 0,
        });
    }

    Ok(totals)
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.split('-').next()?.parse().ok()
}

fn parse_month(raw: &str) -> Option<u32> {
    if let Ok(number) = raw.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }
    let prefix = raw.get(..3)?;
    MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| abbr.eq_ignore_ascii_case(prefix))
        .map(|i| i as u32 + 1)
}
