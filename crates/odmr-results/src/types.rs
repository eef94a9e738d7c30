//! Result data types.

use odmr_project::{ContrastOutput, ContrastPoint, RunOutput, SeriesOutput};
use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    /// Study name
    pub study: String,
    /// Run id within the study
    pub run: String,
    pub timestamp: String,
    pub run_type: RunType,
    pub solver_version: String,
}

impl RunManifest {
    /// Manifest describing `output`, stamped with the current UTC time.
    pub fn new(
        run_id: RunId,
        study: impl Into<String>,
        run: impl Into<String>,
        output: &RunOutput,
        solver_version: &str,
    ) -> Self {
        let run_type = match output {
            RunOutput::Series(series) => RunType::Series {
                columns: series.columns.clone(),
            },
            RunOutput::Contrast(contrast) => RunType::Contrast {
                x_label: contrast.x_label.clone(),
            },
        };
        Self {
            run_id,
            study: study.into(),
            run: run.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            run_type,
            solver_version: solver_version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunType {
    Series { columns: Vec<String> },
    Contrast { x_label: String },
}

/// One sample of a time series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeseriesRecord {
    pub time_s: f64,
    pub values: Vec<f64>,
}

/// One row of a stored run, as written to `records.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Record {
    Series(TimeseriesRecord),
    Contrast(ContrastPoint),
}

/// Flatten an output into per-line records.
pub fn output_records(output: &RunOutput) -> Vec<Record> {
    match output {
        RunOutput::Series(series) => series
            .times_s
            .iter()
            .zip(&series.rows)
            .map(|(&time_s, row)| {
                Record::Series(TimeseriesRecord {
                    time_s,
                    values: row.clone(),
                })
            })
            .collect(),
        RunOutput::Contrast(contrast) => contrast.points.iter().copied().map(Record::Contrast).collect(),
    }
}

/// Rebuild an output from its manifest and records. `None` when a record
/// does not match the manifest's run type.
pub fn assemble_output(run_type: &RunType, records: Vec<Record>) -> Option<RunOutput> {
    match run_type {
        RunType::Series { columns } => {
            let mut times_s = Vec::with_capacity(records.len());
            let mut rows = Vec::with_capacity(records.len());
            for record in records {
                let Record::Series(sample) = record else {
                    return None;
                };
                if sample.values.len() != columns.len() {
                    return None;
                }
                times_s.push(sample.time_s);
                rows.push(sample.values);
            }
            Some(RunOutput::Series(SeriesOutput {
                columns: columns.clone(),
                times_s,
                rows,
            }))
        }
        RunType::Contrast { x_label } => {
            let points = records
                .into_iter()
                .map(|record| match record {
                    Record::Contrast(point) => Some(point),
                    Record::Series(_) => None,
                })
                .collect::<Option<Vec<_>>>()?;
            Some(RunOutput::Contrast(ContrastOutput {
                x_label: x_label.clone(),
                points,
            }))
        }
    }
}
