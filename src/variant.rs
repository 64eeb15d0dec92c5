//! Variant identity model: keys, hashed ids, lab calls and consensus records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::allele::VariantType;
use crate::classification::{Classification, ConsensusLabel, Tally};

/// Number of hex characters kept from the SHA-256 digest for a variant id.
pub const VARIANT_ID_LEN: usize = 10;

/// Identity tuple of a variant, alleles kept left-anchored as submitted.
/// Two keys denote the same variant iff all five fields match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub chromosome: String,
    /// 1-based start position.
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub gene: String,
}

impl VariantKey {
    pub fn new(
        chromosome: impl Into<String>,
        position: u64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
        gene: impl Into<String>,
    ) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
            reference: reference.into(),
            alternate: alternate.into(),
            gene: gene.into(),
        }
    }

    /// Canonical unhashed identity string, also the legacy row id format of
    /// early exports.
    pub fn identity_string(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.chromosome, self.position, self.reference, self.alternate, self.gene
        )
    }

    /// Stable hashed row id: first [`VARIANT_ID_LEN`] hex characters of the
    /// SHA-256 of the identity string.
    pub fn id(&self) -> String {
        variant_id(&self.identity_string())
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity_string())
    }
}

/// Hash an identity string into the truncated fingerprint used as row id.
pub fn variant_id(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    let mut hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    hex.truncate(VARIANT_ID_LEN);
    hex
}

/// One classification submission by one lab. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LabCall {
    /// Submitting lab; filled in by the data source, not part of the row.
    #[serde(default, skip_serializing)]
    pub lab: String,
    pub chromosome: String,
    /// 1-based start position.
    pub start: u64,
    /// Optional stop position; kept verbatim for the output table.
    #[serde(default)]
    pub stop: Option<u64>,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "alt")]
    pub alternate: String,
    pub gene: String,
    /// Raw 5-tier classification code; validated by the engine.
    pub classification: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub c_dna: Option<String>,
    #[serde(default)]
    pub protein: Option<String>,
    #[serde(default)]
    pub hgvs: Option<String>,
}

/// Consensus state of one unique variant, owned by the engine during a run
/// and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusRecord {
    /// Hashed row id.
    pub id: String,
    /// Identity fields, alleles as submitted.
    pub key: VariantKey,
    pub stop: Option<u64>,
    pub transcript: Option<String>,
    pub c_dna: Option<String>,
    pub protein: Option<String>,
    pub hgvs: Option<String>,
    /// Mutation type derived from the minimal allele representation.
    pub variant_type: VariantType,
    pub classification: ConsensusLabel,
    /// Per-lab 5-tier classifications; keyed by lab id.
    pub lab_classifications: BTreeMap<String, Classification>,
    pub tally: Tally,
    /// Lineage ids matched in prior exports; empty for first-seen variants.
    pub history: Vec<String>,
}

impl ConsensusRecord {
    /// Number of labs with a non-empty classification for this variant.
    pub fn match_count(&self) -> usize {
        self.lab_classifications.len()
    }

    /// Match count as surfaced in the consensus table: present for tier
    /// labels and `Classified by one lab`, absent for conflict states.
    pub fn reported_match_count(&self) -> Option<usize> {
        if self.classification.shows_match_count() {
            Some(self.match_count())
        } else {
            None
        }
    }

    /// Classification submitted by one lab, if any.
    pub fn lab_classification(&self, lab: &str) -> Option<Classification> {
        self.lab_classifications.get(lab).copied()
    }
}
