//! Report derivations over the finalized consensus table: classification and
//! mutation-type counts, the public subset, and audit listings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::allele::{needs_simplification, VariantType};
use crate::classification::{Classification, ConsensusLabel, PublicClassification};
use crate::variant::ConsensusRecord;

/// One row of the public consensus subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRow {
    pub id: String,
    /// Display form `"{chr}:{pos} {gene} {ref}>{alt}"`.
    pub label: String,
    /// `"1 lab"` or `"{n} labs"`.
    pub support: String,
    /// Abbreviated classification, LB/VUS/LP.
    pub classification: PublicClassification,
}

/// One row of the opposite-classifications audit listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OppositeRow {
    pub chromosome: String,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub gene: String,
    pub transcript: String,
    pub c_dna: String,
    /// Per-lab 5-tier labels, in configured lab order; empty when the lab
    /// did not classify.
    pub lab_classifications: Vec<String>,
}

/// Mutation-type distribution for one lab.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeCounts {
    pub snp: usize,
    pub ins: usize,
    pub del: usize,
    pub delins: usize,
}

impl TypeCounts {
    fn record(&mut self, variant_type: VariantType) {
        match variant_type {
            VariantType::Snp => self.snp += 1,
            VariantType::Ins | VariantType::Dup => self.ins += 1,
            VariantType::Del => self.del += 1,
            VariantType::Delins => self.delins += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.snp + self.ins + self.del + self.delins
    }

    /// Percentage of one count against the lab's total, one decimal.
    pub fn percentage(&self, count: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (count as f64 * 1000.0 / total as f64).round() / 10.0
    }
}

/// Read-only view over the finalized consensus records, in configured lab
/// order.
pub struct ReportAggregator<'a> {
    records: &'a [ConsensusRecord],
    labs: &'a [String],
}

impl<'a> ReportAggregator<'a> {
    pub fn new(records: &'a [ConsensusRecord], labs: &'a [String]) -> Self {
        Self { records, labs }
    }

    /// Row count per consensus label.
    pub fn classification_counts(&self) -> BTreeMap<ConsensusLabel, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records {
            *counts.entry(record.classification).or_insert(0) += 1;
        }
        counts
    }

    /// For single-lab rows, the submitting lab's tier; first non-empty lab in
    /// configured order decides.
    pub fn single_lab_counts(&self) -> BTreeMap<Classification, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records {
            if record.classification != ConsensusLabel::ClassifiedByOneLab {
                continue;
            }
            if let Some(tier) = self.resolve_single_lab(record) {
                *counts.entry(tier).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Mutation-type distribution per lab over that lab's classified rows.
    pub fn variant_type_counts(&self) -> BTreeMap<String, TypeCounts> {
        let mut counts: BTreeMap<String, TypeCounts> = BTreeMap::new();
        for record in self.records {
            for lab in self.labs {
                if record.lab_classification(lab).is_some() {
                    counts
                        .entry(lab.clone())
                        .or_default()
                        .record(record.variant_type);
                }
            }
        }
        counts
    }

    /// Public subset: tier-labeled rows plus resolved single-lab rows, with
    /// abbreviated classifications and a support string.
    pub fn public_rows(&self) -> Vec<PublicRow> {
        let mut rows = Vec::new();
        for record in self.records {
            let classification = if record.classification.is_tier() {
                PublicClassification::from_label(record.classification.as_str())
            } else if record.classification == ConsensusLabel::ClassifiedByOneLab {
                self.resolve_single_lab(record)
                    .and_then(|tier| PublicClassification::from_label(tier.full_label()))
            } else {
                None
            };
            let Some(classification) = classification else {
                continue;
            };
            let matches = record.match_count();
            let support = if matches == 1 {
                "1 lab".to_string()
            } else {
                format!("{matches} labs")
            };
            rows.push(PublicRow {
                id: record.id.clone(),
                label: display_label(record),
                support,
                classification,
            });
        }
        rows
    }

    /// Audit listing of all `Opposite classifications` rows.
    pub fn opposite_rows(&self) -> Vec<OppositeRow> {
        self.records
            .iter()
            .filter(|record| {
                record.classification == ConsensusLabel::OppositeClassifications
            })
            .map(|record| OppositeRow {
                chromosome: record.key.chromosome.clone(),
                position: record.key.position,
                reference: record.key.reference.clone(),
                alternate: record.key.alternate.clone(),
                gene: record.key.gene.clone(),
                transcript: record.transcript.clone().unwrap_or_default(),
                c_dna: record.c_dna.clone().unwrap_or_default(),
                lab_classifications: self
                    .labs
                    .iter()
                    .map(|lab| {
                        record
                            .lab_classification(lab)
                            .map(|tier| tier.full_label().to_string())
                            .unwrap_or_default()
                    })
                    .collect(),
            })
            .collect()
    }

    /// Delins rows, listed for manual notation review.
    pub fn delins_rows(&self) -> Vec<&'a ConsensusRecord> {
        self.records
            .iter()
            .filter(|record| record.variant_type == VariantType::Delins)
            .collect()
    }

    /// Rows whose stored alleles still share a prefix or suffix. Should be
    /// empty after engine normalization; non-empty output flags a pipeline
    /// fault upstream.
    pub fn needs_simplification_rows(&self) -> Vec<&'a ConsensusRecord> {
        self.records
            .iter()
            .filter(|record| {
                needs_simplification(&record.key.reference, &record.key.alternate)
            })
            .collect()
    }

    fn resolve_single_lab(&self, record: &ConsensusRecord) -> Option<Classification> {
        self.labs
            .iter()
            .find_map(|lab| record.lab_classification(lab))
    }
}

/// Display form used by the public and audit listings.
pub fn display_label(record: &ConsensusRecord) -> String {
    format!(
        "{}:{} {} {}>{}",
        record.key.chromosome,
        record.key.position,
        record.key.gene,
        record.key.reference,
        record.key.alternate
    )
}
