//! Tab-delimited table writers for the consensus run artifacts.
//!
//! Writers only consume finalized records; nothing here feeds back into the
//! engine. Every output file carries the run tag in its name so successive
//! exports never overwrite each other.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::allele::VariantType;
use crate::classification::{Classification, ConsensusLabel, Tally};
use crate::history::IdCorrection;
use crate::report::{OppositeRow, PublicRow, ReportAggregator, TypeCounts};
use crate::variant::{ConsensusRecord, VariantKey};
use crate::Result;

/// Row id of the lab-submission link column: lab uppercased with
/// underscores removed, joined to the variant id.
pub fn lab_link(lab: &str, variant_id: &str) -> String {
    format!("{}_{variant_id}", lab.to_uppercase().replace('_', ""))
}

/// Writes all run artifacts under one output directory, named
/// `{prefix}{table}_{tag}.tsv`.
pub struct Exporter {
    dir: PathBuf,
    prefix: String,
    tag: String,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            tag: tag.into(),
        }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}{table}_{}.tsv", self.prefix, self.tag))
    }

    fn writer(&self, table: &str) -> Result<csv::Writer<fs::File>> {
        fs::create_dir_all(&self.dir)?;
        let path = self.table_path(table);
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)?;
        info!(path = %path.display(), "writing table");
        Ok(writer)
    }

    /// The primary consensus table: identity and notation fields, the
    /// consensus label, one link/classification column pair per lab, match
    /// count, lineage and the comments join key.
    pub fn write_consensus(&self, records: &[ConsensusRecord], labs: &[String]) -> Result<()> {
        let mut writer = self.writer("consensus")?;

        let mut header = vec![
            "id".to_string(),
            "chromosome".to_string(),
            "start".to_string(),
            "stop".to_string(),
            "ref".to_string(),
            "alt".to_string(),
            "gene".to_string(),
            "c_dna".to_string(),
            "transcript".to_string(),
            "protein".to_string(),
            "hgvs".to_string(),
            "consensus_classification".to_string(),
        ];
        for lab in labs {
            header.push(format!("{lab}_link"));
            header.push(lab.clone());
        }
        header.extend(
            ["matches", "history", "disease", "comments"]
                .iter()
                .map(|column| column.to_string()),
        );
        writer.write_record(&header)?;

        for record in records {
            let mut row = vec![
                record.id.clone(),
                record.key.chromosome.clone(),
                record.key.position.to_string(),
                record.stop.map(|stop| stop.to_string()).unwrap_or_default(),
                record.key.reference.clone(),
                record.key.alternate.clone(),
                record.key.gene.clone(),
                record.c_dna.clone().unwrap_or_default(),
                record.transcript.clone().unwrap_or_default(),
                record.protein.clone().unwrap_or_default(),
                record.hgvs.clone().unwrap_or_default(),
                record.classification.as_str().to_string(),
            ];
            for lab in labs {
                match record.lab_classification(lab) {
                    Some(tier) => {
                        row.push(lab_link(lab, &record.id));
                        row.push(tier.full_label().to_string());
                    }
                    None => {
                        row.push(String::new());
                        row.push(String::new());
                    }
                }
            }
            row.push(
                record
                    .reported_match_count()
                    .map(|count| count.to_string())
                    .unwrap_or_default(),
            );
            row.push(record.history.join(","));
            row.push(String::new());
            row.push(record.id.clone());
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Comments table joined on id; every row starts out with the
    /// placeholder comment.
    pub fn write_comments(&self, records: &[ConsensusRecord]) -> Result<()> {
        let mut writer = self.writer("consensus_comments")?;
        writer.write_record(["id", "comments"])?;
        for record in records {
            writer.write_record([record.id.as_str(), "-"])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_public(&self, rows: &[PublicRow]) -> Result<()> {
        let mut writer = self.writer("public_consensus")?;
        writer.write_record(["id", "label", "classification", "support"])?;
        for row in rows {
            writer.write_record([
                row.id.as_str(),
                row.label.as_str(),
                row.classification.as_str(),
                row.support.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_opposites(&self, rows: &[OppositeRow], labs: &[String]) -> Result<()> {
        let mut writer = self.writer("opposites")?;
        let mut header = vec![
            "chromosome".to_string(),
            "position".to_string(),
            "ref".to_string(),
            "alt".to_string(),
            "gene".to_string(),
            "transcript".to_string(),
            "c_dna".to_string(),
        ];
        header.extend(labs.iter().cloned());
        writer.write_record(&header)?;
        for row in rows {
            let mut record = vec![
                row.chromosome.clone(),
                row.position.to_string(),
                row.reference.clone(),
                row.alternate.clone(),
                row.gene.clone(),
                row.transcript.clone(),
                row.c_dna.clone(),
            ];
            record.extend(row.lab_classifications.iter().cloned());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Consensus-label counts plus the single-lab tier breakdown.
    pub fn write_counts(
        &self,
        classification_counts: &BTreeMap<ConsensusLabel, usize>,
        single_lab_counts: &BTreeMap<Classification, usize>,
    ) -> Result<()> {
        let mut writer = self.writer("counts")?;
        writer.write_record(["classification", "count"])?;
        for (label, count) in classification_counts {
            writer.write_record([label.as_str().to_string(), count.to_string()])?;
        }
        for (tier, count) in single_lab_counts {
            writer.write_record([
                format!("Classified by one lab: {}", tier.full_label()),
                count.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_variant_types(
        &self,
        counts: &BTreeMap<String, TypeCounts>,
    ) -> Result<()> {
        let mut writer = self.writer("variant_types")?;
        writer.write_record(["lab", "type", "count", "percentage"])?;
        for (lab, types) in counts {
            for (name, count) in [
                ("snp", types.snp),
                ("ins", types.ins),
                ("del", types.del),
                ("delins", types.delins),
            ] {
                writer.write_record([
                    lab.clone(),
                    name.to_string(),
                    count.to_string(),
                    format!("{:.1}", types.percentage(count)),
                ])?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_corrections(&self, corrections: &[IdCorrection]) -> Result<()> {
        let mut writer = self.writer("corrections")?;
        writer.write_record(["variant_id", "replaced_by", "message"])?;
        for correction in corrections {
            writer.write_record([
                correction.variant_id.as_str(),
                correction.replaced_by.as_str(),
                correction.message.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Delins rows, listed for manual notation review.
    pub fn write_delins(&self, records: &[&ConsensusRecord]) -> Result<()> {
        let mut writer = self.writer("delins")?;
        writer.write_record(["id", "chromosome", "start", "ref", "alt", "gene"])?;
        for record in records {
            writer.write_record([
                record.id.clone(),
                record.key.chromosome.clone(),
                record.key.position.to_string(),
                record.key.reference.clone(),
                record.key.alternate.clone(),
                record.key.gene.clone(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Rows whose alleles are padded beyond the single left-anchor base,
    /// listed for notation cleanup.
    pub fn write_quality_log(&self, records: &[&ConsensusRecord]) -> Result<()> {
        let mut writer = self.writer("log")?;
        writer.write_record(["id", "chromosome", "start", "ref", "alt", "gene"])?;
        for record in records {
            writer.write_record([
                record.id.clone(),
                record.key.chromosome.clone(),
                record.key.position.to_string(),
                record.key.reference.clone(),
                record.key.alternate.clone(),
                record.key.gene.clone(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Convenience wrapper writing every artifact of a finished run.
    pub fn write_all(
        &self,
        records: &[ConsensusRecord],
        labs: &[String],
        corrections: &[IdCorrection],
    ) -> Result<()> {
        let report = ReportAggregator::new(records, labs);
        self.write_consensus(records, labs)?;
        self.write_comments(records)?;
        self.write_public(&report.public_rows())?;
        self.write_opposites(&report.opposite_rows(), labs)?;
        self.write_counts(&report.classification_counts(), &report.single_lab_counts())?;
        self.write_variant_types(&report.variant_type_counts())?;
        self.write_corrections(corrections)?;
        self.write_delins(&report.delins_rows())?;
        self.write_quality_log(&report.needs_simplification_rows())?;
        Ok(())
    }
}

/// Read a previously written consensus table back for report-only runs.
pub fn read_consensus(path: &Path, labs: &[String]) -> Result<Vec<ConsensusRecord>> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_path(path)?;
    let headers = reader.headers()?.clone();
    let index = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| crate::error::ConsensusError::Table {
                msg: format!("consensus table is missing column '{name}'"),
            })
    };
    let field = |row: &csv::StringRecord, at: usize| -> String {
        row.get(at).unwrap_or_default().to_string()
    };

    let id_at = index("id")?;
    let chromosome_at = index("chromosome")?;
    let start_at = index("start")?;
    let stop_at = index("stop")?;
    let ref_at = index("ref")?;
    let alt_at = index("alt")?;
    let gene_at = index("gene")?;
    let c_dna_at = index("c_dna")?;
    let transcript_at = index("transcript")?;
    let protein_at = index("protein")?;
    let hgvs_at = index("hgvs")?;
    let label_at = index("consensus_classification")?;
    let history_at = index("history")?;
    let lab_at: Vec<(String, usize)> = labs
        .iter()
        .map(|lab| index(lab).map(|at| (lab.clone(), at)))
        .collect::<Result<_>>()?;

    let parse_error = |msg: String| crate::error::ConsensusError::Table { msg };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let position: u64 = field(&row, start_at)
            .parse()
            .map_err(|_| parse_error(format!("bad start position in row {}", field(&row, id_at))))?;
        let stop_text = field(&row, stop_at);
        let stop = if stop_text.is_empty() {
            None
        } else {
            Some(stop_text.parse().map_err(|_| {
                parse_error(format!("bad stop position in row {}", field(&row, id_at)))
            })?)
        };
        let classification: ConsensusLabel = field(&row, label_at)
            .parse()
            .map_err(|_| parse_error(format!("bad label in row {}", field(&row, id_at))))?;

        let mut lab_classifications = BTreeMap::new();
        let mut tally = Tally::default();
        for (lab, at) in &lab_at {
            let label = field(&row, *at);
            if label.is_empty() {
                continue;
            }
            let tier = Classification::from_code(&label).ok_or_else(|| {
                parse_error(format!("bad lab classification '{label}' in row {}", field(&row, id_at)))
            })?;
            lab_classifications.insert(lab.clone(), tier);
            tally.record(tier);
        }

        let history_text = field(&row, history_at);
        let history = if history_text.is_empty() {
            Vec::new()
        } else {
            history_text.split(',').map(|id| id.to_string()).collect()
        };

        let reference = field(&row, ref_at);
        let alternate = field(&row, alt_at);
        let optional = |text: String| (!text.is_empty()).then_some(text);
        records.push(ConsensusRecord {
            id: field(&row, id_at),
            variant_type: VariantType::of(&reference, &alternate),
            key: VariantKey::new(
                field(&row, chromosome_at),
                position,
                reference,
                alternate,
                field(&row, gene_at),
            ),
            stop,
            transcript: optional(field(&row, transcript_at)),
            c_dna: optional(field(&row, c_dna_at)),
            protein: optional(field(&row, protein_at)),
            hgvs: optional(field(&row, hgvs_at)),
            classification,
            lab_classifications,
            tally,
            history,
        });
    }
    Ok(records)
}
