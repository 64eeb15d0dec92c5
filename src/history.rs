//! Lineage matching against prior export snapshots.
//!
//! Variant notation changed convention several times across exports: deletions
//! and insertions were once written without a left-anchor base, delins rows
//! once carried an extra anchor base whose identity is no longer recoverable,
//! and some exports contained duplicate-suffixed row ids. A variant therefore
//! has several historically valid identity strings, all of which are probed
//! against every configured export to assemble the lineage list.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::allele::{VariantType, ABSENT_ALLELE};
use crate::variant::{variant_id, ConsensusRecord};

/// Anchor bases probed for delins rows, in fixed candidate order.
const ANCHOR_BASES: [char; 4] = ['A', 'G', 'T', 'C'];

/// Suffixes under which duplicate rows appeared within a single export.
const DUP_SUFFIXES: [&str; 2] = ["_dup0", "_dup1"];

/// One row of a prior export snapshot. The id carries the export tag as a
/// `yymm_` prefix; gene, transcript and cDNA are present when the export
/// recorded them and feed the alternative-identity index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub c_dna: Option<String>,
}

/// Audit record for a lineage id recovered through the alternative index
/// rather than a direct identity match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCorrection {
    pub variant_id: String,
    pub replaced_by: String,
    pub message: String,
}

/// One export snapshot: the set of row ids it contained plus the
/// transcript-level alternative index.
#[derive(Debug, Default)]
struct HistoryExport {
    ids: HashSet<String>,
    /// `"{gene}_{transcript}:{c_dna}"` to the full row id; first entry wins.
    alternatives: HashMap<String, String>,
}

/// All configured prior exports, keyed by `yymm` tag in ascending order.
#[derive(Debug, Default)]
pub struct HistoryStore {
    exports: BTreeMap<String, HistoryExport>,
}

impl HistoryStore {
    /// Bucket history rows by the export tag prefixed to their id. Rows whose
    /// tag is not among the configured prior exports are dropped.
    pub fn from_records(records: Vec<HistoryRecord>, previous: &[String]) -> Self {
        let configured: HashSet<&str> = previous.iter().map(String::as_str).collect();
        let mut exports: BTreeMap<String, HistoryExport> = BTreeMap::new();
        let mut skipped = 0usize;
        for record in records {
            let Some(tag) = record.id.split('_').next() else {
                continue;
            };
            if !configured.contains(tag) {
                skipped += 1;
                continue;
            }
            let export = exports.entry(tag.to_string()).or_default();
            if let (Some(gene), Some(transcript), Some(c_dna)) =
                (&record.gene, &record.transcript, &record.c_dna)
            {
                let key = format!("{gene}_{transcript}:{c_dna}");
                export
                    .alternatives
                    .entry(key)
                    .or_insert_with(|| record.id.clone());
            }
            export.ids.insert(record.id);
        }
        if skipped > 0 {
            warn!(skipped, "dropped history rows with unconfigured export tags");
        }
        Self { exports }
    }

    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    /// Match one variant against every export, returning its lineage ids and
    /// any corrections recovered through the alternative index.
    pub fn matches(&self, record: &ConsensusRecord) -> (Vec<String>, Vec<IdCorrection>) {
        let candidates = candidate_ids(record);
        let mut lineage = Vec::new();
        let mut corrections = Vec::new();

        for (tag, export) in &self.exports {
            let mut anchor_hits = 0usize;
            for (index, candidate) in candidates.iter().enumerate() {
                let tagged = format!("{tag}_{candidate}");
                for probe in std::iter::once(tagged.clone())
                    .chain(DUP_SUFFIXES.iter().map(|suffix| format!("{tagged}{suffix}")))
                {
                    if export.ids.contains(&probe) {
                        if record.variant_type == VariantType::Delins && index >= 2 {
                            anchor_hits += 1;
                        }
                        lineage.push(probe);
                    }
                }
            }
            if anchor_hits > 1 {
                warn!(
                    variant = %record.key,
                    export = %tag,
                    hits = anchor_hits,
                    "multiple anchor-base probes matched; keeping all lineage ids"
                );
            }

            if let (Some(transcript), Some(c_dna)) = (&record.transcript, &record.c_dna) {
                let key = format!("{}_{transcript}:{c_dna}", record.key.gene);
                if let Some(alternative) = export.alternatives.get(&key) {
                    if !lineage.contains(alternative) {
                        corrections.push(IdCorrection {
                            variant_id: record.id.clone(),
                            replaced_by: alternative.clone(),
                            message: format!(
                                "matched export {tag} via {key} instead of coordinates"
                            ),
                        });
                        lineage.push(alternative.clone());
                    }
                }
            }
        }

        (lineage, corrections)
    }
}

/// Enumerate every identity string under which this variant may have appeared
/// in a prior export, in fixed deterministic order: the hashed id, the
/// unhashed legacy form, then the convention-shifted forms for its type.
pub fn candidate_ids(record: &ConsensusRecord) -> Vec<String> {
    let key = &record.key;
    let mut candidates = vec![record.id.clone(), key.identity_string()];

    match record.variant_type {
        VariantType::Del if key.reference.len() > 1 => {
            // pre-anchor convention: no leading base, position shifted right
            candidates.push(format!(
                "{}_{}_{}_{}_{}",
                key.chromosome,
                key.position + 1,
                &key.reference[1..],
                ABSENT_ALLELE,
                key.gene
            ));
        }
        VariantType::Ins | VariantType::Dup if key.alternate.len() > 1 => {
            candidates.push(format!(
                "{}_{}_{}_{}_{}",
                key.chromosome,
                key.position,
                ABSENT_ALLELE,
                &key.alternate[1..],
                key.gene
            ));
        }
        VariantType::Delins => {
            // the historical anchor base is unrecoverable; probe all four
            for anchor in ANCHOR_BASES {
                let identity = format!(
                    "{}_{}_{anchor}{}_{anchor}{}_{}",
                    key.chromosome,
                    key.position.saturating_sub(1),
                    key.reference,
                    key.alternate,
                    key.gene
                );
                candidates.push(variant_id(&identity));
            }
        }
        _ => {}
    }
    candidates
}

/// Attach lineage ids to every record, collecting correction audit records.
pub fn attach_history(
    store: &HistoryStore,
    records: &mut [ConsensusRecord],
) -> Vec<IdCorrection> {
    let mut corrections = Vec::new();
    let mut matched = 0usize;
    for record in records.iter_mut() {
        let (lineage, mut found) = store.matches(record);
        if !lineage.is_empty() {
            matched += 1;
        }
        record.history = lineage;
        corrections.append(&mut found);
    }
    debug!(
        variants = records.len(),
        matched,
        corrections = corrections.len(),
        "attached history lineage"
    );
    corrections
}
