pub mod config;
pub mod error;
pub mod fetch;
pub mod headers;
pub mod load;
pub mod pipeline;
pub mod structs;
pub mod transform;
pub mod window;

#[cfg(test)]
mod testing;

// Re-export public API
pub use error::{PipelineError, Result};
pub use fetch::{Fetcher, HttpResponse, ReqwestTransport, Transport};
pub use load::{output_file_name, read_totals_csv, write_csv, write_json};
pub use pipeline::{DatasetOutcome, DatasetReport, RunOptions, run};
pub use structs::{
    Aggregation, AnnualSource, DatasetKind, DatasetSelection, FetchConfig, Granularity,
    Measurement, Observation, SimpleLogger, Total,
};
pub use transform::{aggregate, retain_measurement};
pub use window::QueryWindow;
