//! Run driver: retrieve, fold, match history, export, report.

use std::collections::BTreeMap;
use std::fs::File;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use crate::config::RunConfig;
use crate::engine::ConsensusEngine;
use crate::export::{read_consensus, Exporter};
use crate::history::{attach_history, HistoryStore};
use crate::report::ReportAggregator;
use crate::retrieve::{retrieve_all, LabDataSource, TsvSource};
use crate::Result;

/// Outcome of a completed run, also written as a JSON artifact next to the
/// tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub tag: String,
    pub variants: usize,
    pub corrections: usize,
    /// Row count per consensus label.
    pub classifications: BTreeMap<String, usize>,
}

fn progress_bar(len: u64, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(message);
    bar
}

/// Full pipeline against the config's flat-file input directory, tagged with
/// the current `yymm`.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let tag = chrono::Local::now().format("%y%m").to_string();
    let source = TsvSource::new(
        &config.input,
        config.prefix.as_str(),
        config.history_file.as_str(),
    );
    run_with_source(config, &source, &tag)
}

/// Pipeline body, generic over the data source so tests can supply in-memory
/// fixtures and reruns can pin the export tag.
pub fn run_with_source<S: LabDataSource>(
    config: &RunConfig,
    source: &S,
    tag: &str,
) -> Result<RunSummary> {
    config.validate()?;
    info!(tag, labs = config.labs.len(), "starting consensus run");

    let (lab_calls, history) = retrieve_all(source, &config.labs)?;

    let mut engine = ConsensusEngine::new();
    let folding = progress_bar(lab_calls.len() as u64, "folding labs");
    for (lab, calls) in &lab_calls {
        engine.fold_lab(lab, calls)?;
        folding.inc(1);
    }
    folding.finish_and_clear();

    let mut records = engine.finish();
    let store = HistoryStore::from_records(history, &config.previous);
    info!(
        variants = records.len(),
        exports = store.export_count(),
        "matching history"
    );
    let corrections = attach_history(&store, &mut records);

    let exporter = Exporter::new(&config.output, config.prefix.as_str(), tag);
    exporter.write_all(&records, &config.labs, &corrections)?;

    let report = ReportAggregator::new(&records, &config.labs);
    let summary = RunSummary {
        tag: tag.to_string(),
        variants: records.len(),
        corrections: corrections.len(),
        classifications: report
            .classification_counts()
            .into_iter()
            .map(|(label, count)| (label.as_str().to_string(), count))
            .collect(),
    };
    write_summary(config, tag, &summary)?;
    info!(
        variants = summary.variants,
        corrections = summary.corrections,
        "consensus run finished"
    );
    Ok(summary)
}

fn write_summary(config: &RunConfig, tag: &str, summary: &RunSummary) -> Result<()> {
    let path = config
        .output
        .join(format!("{}summary_{tag}.json", config.prefix));
    serde_json::to_writer_pretty(File::create(path)?, summary)?;
    Ok(())
}

/// Re-derive all report tables from an existing consensus table, without
/// refetching lab data or recomputing consensus.
pub fn rerun_reports(config: &RunConfig, tag: &str) -> Result<RunSummary> {
    config.validate()?;
    let exporter = Exporter::new(&config.output, config.prefix.as_str(), tag);
    let records = read_consensus(&exporter.table_path("consensus"), &config.labs)?;
    info!(tag, variants = records.len(), "rebuilding reports");

    let report = ReportAggregator::new(&records, &config.labs);
    exporter.write_public(&report.public_rows())?;
    exporter.write_opposites(&report.opposite_rows(), &config.labs)?;
    exporter.write_counts(&report.classification_counts(), &report.single_lab_counts())?;
    exporter.write_variant_types(&report.variant_type_counts())?;
    exporter.write_delins(&report.delins_rows())?;
    exporter.write_quality_log(&report.needs_simplification_rows())?;

    Ok(RunSummary {
        tag: tag.to_string(),
        variants: records.len(),
        corrections: 0,
        classifications: report
            .classification_counts()
            .into_iter()
            .map(|(label, count)| (label.as_str().to_string(), count))
            .collect(),
    })
}
