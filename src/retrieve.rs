//! Batch input: per-lab call tables and the history table.
//!
//! Each data source is fetched by its own worker; the join barrier in
//! [`retrieve_all`] guarantees the engine only runs once every configured
//! lab's data is present. A failed or empty lab fetch aborts the run.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use rayon::prelude::*;
use tracing::info;

use crate::error::ConsensusError;
use crate::history::HistoryRecord;
use crate::variant::LabCall;
use crate::Result;

/// Source of lab call tables and the prior-export history table. The flat
/// file implementation below stands in for the consortium's data service.
pub trait LabDataSource: Sync {
    fn fetch_lab(&self, lab: &str) -> Result<Vec<LabCall>>;
    fn fetch_history(&self) -> Result<Vec<HistoryRecord>>;
}

/// Flat-file source reading tab-delimited tables, plain or gzipped.
/// Lab tables live at `{dir}/{prefix}{lab}.tsv[.gz]`.
#[derive(Debug, Clone)]
pub struct TsvSource {
    dir: PathBuf,
    prefix: String,
    history_file: String,
}

impl TsvSource {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, history_file: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            history_file: history_file.into(),
        }
    }

    /// Resolve `{stem}.tsv` or its gzipped sibling, whichever exists.
    fn resolve(&self, stem: &str) -> Option<PathBuf> {
        let plain = self.dir.join(format!("{stem}.tsv"));
        if plain.exists() {
            return Some(plain);
        }
        let gz = self.dir.join(format!("{stem}.tsv.gz"));
        gz.exists().then_some(gz)
    }
}

/// Open a possibly-gzipped file for buffered reading.
fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn read_table<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(open_reader(path)?);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

impl LabDataSource for TsvSource {
    fn fetch_lab(&self, lab: &str) -> Result<Vec<LabCall>> {
        let stem = format!("{}{lab}", self.prefix);
        let path = self
            .resolve(&stem)
            .ok_or_else(|| ConsensusError::missing_lab(lab, format!("no file {stem}.tsv[.gz]")))?;
        let mut calls: Vec<LabCall> = read_table(&path)?;
        for call in &mut calls {
            call.lab = lab.to_string();
        }
        info!(lab, calls = calls.len(), path = %path.display(), "fetched lab table");
        Ok(calls)
    }

    fn fetch_history(&self) -> Result<Vec<HistoryRecord>> {
        let stem = self.history_file.trim_end_matches(".tsv");
        let Some(path) = self.resolve(stem) else {
            // first run of a consortium has no prior exports
            info!("no history table found, continuing with empty lineage");
            return Ok(Vec::new());
        };
        let records = read_table(&path)?;
        info!(records = records.len(), path = %path.display(), "fetched history table");
        Ok(records)
    }
}

/// Fetch every lab table and the history table in parallel, one worker per
/// source, and join before returning. Lab order in the result follows the
/// configured order. An empty lab table is an error: consensus requires
/// every configured lab's data.
pub fn retrieve_all<S: LabDataSource>(
    source: &S,
    labs: &[String],
) -> Result<(Vec<(String, Vec<LabCall>)>, Vec<HistoryRecord>)> {
    let (lab_calls, history) = rayon::join(
        || {
            labs.par_iter()
                .map(|lab| {
                    let calls = source.fetch_lab(lab)?;
                    if calls.is_empty() {
                        return Err(ConsensusError::missing_lab(lab, "table is empty"));
                    }
                    Ok((lab.clone(), calls))
                })
                .collect::<Result<Vec<_>>>()
        },
        || source.fetch_history(),
    );
    Ok((lab_calls?, history?))
}
