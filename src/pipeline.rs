use crate::error::{PipelineError, Result};
use crate::fetch::{Fetcher, Transport};
use crate::load::{output_file_name, write_csv, write_json};
use crate::structs::{AnnualSource, DatasetKind, DatasetSelection, Measurement, Observation};
use crate::transform::{aggregate, retain_measurement};
use crate::window::QueryWindow;
use log::{error, info, warn};
use std::fs;
use std::path::PathBuf;

/// Everything a run needs besides the fetcher itself
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub station: String,
    pub measurement: Measurement,
    pub window: QueryWindow,
    pub datasets: DatasetSelection,
    pub annual_source: AnnualSource,
    pub output_dir: PathBuf,
    /// Output files are named `{file_prefix}_{dataset}.{csv,json}`
    pub file_prefix: String,
    pub write_json: bool,
}

#[derive(Debug)]
pub enum DatasetOutcome {
    /// Totals were written to `path`
    Written {
        path: PathBuf,
        rows: usize,
        rejected: usize,
    },
    /// The remote returned no records; nothing was written
    Empty,
    /// Records came back but every one failed data checks; nothing was written
    AllRejected { rejected: usize },
    Failed(PipelineError),
}

#[derive(Debug)]
pub struct DatasetReport {
    pub dataset: DatasetKind,
    pub outcome: DatasetOutcome,
}

impl DatasetReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, DatasetOutcome::Failed(_))
    }
}

/// Fetches, aggregates and writes each selected dataset in turn.
///
/// Monthly and annual are independent: a failure in one is recorded in its
/// report and the other is still attempted. A missing token is fatal for the
/// whole run and is returned as an error.
pub fn run<T: Transport>(
    fetcher: &Fetcher<T>,
    options: &RunOptions,
) -> Result<Vec<DatasetReport>> {
    let mut monthly_cache: Option<Vec<Observation>> = None;
    let mut reports = Vec::new();

    for dataset in [DatasetKind::Monthly, DatasetKind::Annual] {
        if !options.datasets.includes(dataset) {
            continue;
        }

        let outcome = match process_dataset(fetcher, dataset, options, &mut monthly_cache) {
            Ok(outcome) => outcome,
            Err(PipelineError::MissingToken) => return Err(PipelineError::MissingToken),
            Err(err) => {
                error!("{} dataset failed: {}", dataset, err);
                DatasetOutcome::Failed(err)
            }
        };
        reports.push(DatasetReport { dataset, outcome });
    }

    Ok(reports)
}

fn process_dataset<T: Transport>(
    fetcher: &Fetcher<T>,
    dataset: DatasetKind,
    options: &RunOptions,
    monthly_cache: &mut Option<Vec<Observation>>,
) -> Result<DatasetOutcome> {
    let source = match (dataset, options.annual_source) {
        (DatasetKind::Annual, AnnualSource::Monthly) => DatasetKind::Monthly,
        _ => dataset,
    };

    let observations = match (source, monthly_cache.as_ref()) {
        (DatasetKind::Monthly, Some(cached)) => cached.clone(),
        _ => {
            let fetched = fetcher.fetch(
                source,
                options.measurement,
                &options.station,
                options.window.start(),
                options.window.end(),
            )?;
            if source == DatasetKind::Monthly {
                *monthly_cache = Some(fetched.clone());
            }
            fetched
        }
    };
    if source != dataset {
        info!("Deriving {} totals from {} records", dataset, source);
    }

    let observations = retain_measurement(observations, options.measurement);
    if observations.is_empty() {
        info!(
            "No {} data returned for {} ({})",
            dataset, options.station, options.window
        );
        return Ok(DatasetOutcome::Empty);
    }

    let aggregation = aggregate(&observations, dataset.granularity());
    if !aggregation.rejected.is_empty() {
        warn!(
            "{} of {} {} records failed data checks and were excluded",
            aggregation.rejected.len(),
            observations.len(),
            dataset
        );
    }
    if aggregation.totals.is_empty() {
        error!(
            "All {} {} records failed data checks, nothing written",
            observations.len(),
            dataset
        );
        return Ok(DatasetOutcome::AllRejected {
            rejected: aggregation.rejected.len(),
        });
    }

    fs::create_dir_all(&options.output_dir)?;
    let csv_path = options
        .output_dir
        .join(output_file_name(&options.file_prefix, dataset, "csv"));
    write_csv(
        &aggregation.totals,
        dataset.granularity(),
        &options.station,
        options.measurement.unit_label(),
        &csv_path,
    )?;
    if options.write_json {
        let json_path = options
            .output_dir
            .join(output_file_name(&options.file_prefix, dataset, "json"));
        write_json(&aggregation.totals, &json_path)?;
    }

    Ok(DatasetOutcome::Written {
        path: csv_path,
        rows: aggregation.totals.len(),
        rejected: aggregation.rejected.len(),
    })
}
