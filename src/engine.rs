//! Consensus engine: folds per-lab variant calls into one record per unique
//! normalized variant.
//!
//! Folding is tally-based and therefore commutative on the final label, but
//! records are mutated in place, so labs are folded one at a time in the
//! configured order; the engine owns the map exclusively for the run and
//! hands the finalized records off read-only.

use std::collections::BTreeMap;

use tracing::info;

use crate::allele::{simplify, VariantType, ABSENT_ALLELE};
use crate::classification::{Classification, ConsensusLabel, Tally};
use crate::error::ConsensusError;
use crate::variant::{ConsensusRecord, LabCall, VariantKey};
use crate::Result;

/// Aggregates lab calls into consensus records, keyed by the unhashed
/// identity string for deterministic iteration order.
#[derive(Debug, Default)]
pub struct ConsensusEngine {
    records: BTreeMap<String, ConsensusRecord>,
}

impl ConsensusEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unique variants folded so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fold one lab's full call set. Labs must be folded sequentially; the
    /// label outcome does not depend on the order (see module docs), but two
    /// labs must never mutate the same record concurrently.
    pub fn fold_lab(&mut self, lab: &str, calls: &[LabCall]) -> Result<()> {
        for call in calls {
            self.fold_call(lab, call)?;
        }
        info!(lab, calls = calls.len(), variants = self.records.len(), "folded lab");
        Ok(())
    }

    /// Fold a single call: validate the allele pair, determine its type from
    /// the minimal representation, then create or update the consensus
    /// record. The identity keeps the submitted left-anchored alleles; prior
    /// notation conventions are handled by the history probes, not here.
    fn fold_call(&mut self, lab: &str, call: &LabCall) -> Result<()> {
        if call.reference.is_empty() || call.alternate.is_empty() {
            return Err(ConsensusError::MalformedAllele {
                reference: call.reference.clone(),
                alternate: call.alternate.clone(),
            });
        }
        let (short_ref, short_alt) = simplify(&call.reference, &call.alternate);
        if short_ref == ABSENT_ALLELE && short_alt == ABSENT_ALLELE {
            // ref == alt describes no variant at all
            return Err(ConsensusError::MalformedAllele {
                reference: call.reference.clone(),
                alternate: call.alternate.clone(),
            });
        }

        let key = VariantKey::new(
            call.chromosome.clone(),
            call.start,
            call.reference.clone(),
            call.alternate.clone(),
            call.gene.clone(),
        );
        let identity = key.identity_string();

        let tier = Classification::from_code(&call.classification).ok_or_else(|| {
            ConsensusError::InvalidClassification {
                lab: lab.to_string(),
                variant: identity.clone(),
                value: call.classification.clone(),
            }
        })?;

        match self.records.get_mut(&identity) {
            None => {
                let mut tally = Tally::default();
                tally.record(tier);
                let mut lab_classifications = BTreeMap::new();
                lab_classifications.insert(lab.to_string(), tier);
                let record = ConsensusRecord {
                    id: key.id(),
                    variant_type: VariantType::classify(&short_ref, &short_alt),
                    key,
                    stop: call.stop,
                    transcript: call.transcript.clone(),
                    c_dna: call.c_dna.clone(),
                    protein: call.protein.clone(),
                    hgvs: call.hgvs.clone(),
                    classification: ConsensusLabel::ClassifiedByOneLab,
                    lab_classifications,
                    tally,
                    history: Vec::new(),
                };
                self.records.insert(identity, record);
            }
            Some(record) => {
                record.lab_classifications.insert(lab.to_string(), tier);
                record.tally.record(tier);
                record.classification = Self::relabel(&record.tally, tier);
                // fill descriptive fields a previous lab left empty
                if record.transcript.is_none() {
                    record.transcript = call.transcript.clone();
                }
                if record.c_dna.is_none() {
                    record.c_dna = call.c_dna.clone();
                }
                if record.protein.is_none() {
                    record.protein = call.protein.clone();
                }
                if record.hgvs.is_none() {
                    record.hgvs = call.hgvs.clone();
                }
            }
        }
        Ok(())
    }

    /// Assign the consensus label after a fold. Conflict is checked before
    /// no-consensus: when both predicates hold the variant is labeled
    /// `Opposite classifications`. Otherwise exactly one tier group is
    /// represented and the latest tier's group label applies.
    fn relabel(tally: &Tally, latest: Classification) -> ConsensusLabel {
        if tally.is_conflicting() {
            ConsensusLabel::OppositeClassifications
        } else if tally.is_no_consensus() {
            ConsensusLabel::NoConsensus
        } else {
            latest.consensus_label()
        }
    }

    /// Finalize the run and hand the records off read-only.
    pub fn finish(self) -> Vec<ConsensusRecord> {
        self.records.into_values().collect()
    }

    /// Borrow a record by its unhashed identity string.
    pub fn get(&self, identity: &str) -> Option<&ConsensusRecord> {
        self.records.get(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(classification: &str) -> LabCall {
        LabCall {
            lab: String::new(),
            chromosome: "11".to_string(),
            start: 108098576,
            stop: Some(108098576),
            reference: "C".to_string(),
            alternate: "G".to_string(),
            gene: "ATM".to_string(),
            classification: classification.to_string(),
            transcript: Some("NM_000051.3".to_string()),
            c_dna: Some("c.146C>G".to_string()),
            protein: Some("p.S49C".to_string()),
            hgvs: None,
        }
    }

    const IDENTITY: &str = "11_108098576_C_G_ATM";

    fn fold_all(calls: &[(&str, &str)]) -> ConsensusEngine {
        let mut engine = ConsensusEngine::new();
        for (lab, tier) in calls {
            engine.fold_lab(lab, &[call(tier)]).unwrap();
        }
        engine
    }

    #[test]
    fn test_single_lab() {
        let engine = fold_all(&[("lab1", "b")]);
        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(record.classification, ConsensusLabel::ClassifiedByOneLab);
        assert_eq!(record.tally.benign, 1);
        assert_eq!(record.match_count(), 1);
        assert_eq!(record.reported_match_count(), Some(1));
        assert_eq!(record.id, crate::variant::variant_id(IDENTITY));
    }

    #[test]
    fn test_two_labs_agree() {
        let engine = fold_all(&[("lab1", "b"), ("lab2", "lb")]);
        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(record.classification, ConsensusLabel::LikelyBenign);
        assert_eq!(record.tally.total(), 2);
        assert_eq!(record.reported_match_count(), Some(2));
    }

    #[test]
    fn test_opposite_classifications() {
        let engine = fold_all(&[("lab1", "b"), ("lab2", "p")]);
        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(
            record.classification,
            ConsensusLabel::OppositeClassifications
        );
        assert_eq!(record.reported_match_count(), None);
    }

    #[test]
    fn test_no_consensus() {
        let engine = fold_all(&[("lab1", "vus"), ("lab2", "b")]);
        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(record.classification, ConsensusLabel::NoConsensus);
        assert_eq!(record.reported_match_count(), None);
    }

    #[test]
    fn test_no_consensus_persists_on_agreeing_third_lab() {
        let engine = fold_all(&[("lab1", "b"), ("lab2", "vus"), ("lab3", "b")]);
        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(record.classification, ConsensusLabel::NoConsensus);
        assert_eq!(record.tally.benign, 2);
    }

    #[test]
    fn test_opposite_persists_on_vus_third_lab() {
        let engine = fold_all(&[("lab1", "b"), ("lab2", "p"), ("lab3", "vus")]);
        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(
            record.classification,
            ConsensusLabel::OppositeClassifications
        );
    }

    #[test]
    fn test_conflict_takes_precedence_over_no_consensus() {
        // b, p and vus all present: both predicates hold, conflict wins
        let engine = fold_all(&[("lab1", "b"), ("lab2", "vus"), ("lab3", "p")]);
        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(
            record.classification,
            ConsensusLabel::OppositeClassifications
        );
    }

    #[test]
    fn test_vus_only_consensus() {
        let engine = fold_all(&[("lab1", "vus"), ("lab2", "vus")]);
        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(record.classification, ConsensusLabel::Vus);
        assert_eq!(record.reported_match_count(), Some(2));
    }

    #[test]
    fn test_fold_order_does_not_change_outcome() {
        let tiers = ["b", "vus", "p", "lb"];
        let labs = ["lab1", "lab2", "lab3", "lab4"];
        let baseline = {
            let calls: Vec<(&str, &str)> =
                labs.iter().copied().zip(tiers.iter().copied()).collect();
            let engine = fold_all(&calls);
            engine.get(IDENTITY).unwrap().clone()
        };

        // rotate the fold order; label and tally must not change
        for rotation in 1..tiers.len() {
            let mut rotated: Vec<(&str, &str)> =
                labs.iter().copied().zip(tiers.iter().copied()).collect();
            rotated.rotate_left(rotation);
            let engine = fold_all(&rotated);
            let record = engine.get(IDENTITY).unwrap();
            assert_eq!(record.classification, baseline.classification);
            assert_eq!(record.tally, baseline.tally);
            assert_eq!(record.lab_classifications, baseline.lab_classifications);
        }
    }

    #[test]
    fn test_identity_keeps_submitted_alleles() {
        // the identity stays anchored as submitted; typing sees through it
        let mut engine = ConsensusEngine::new();
        let mut anchored = call("b");
        anchored.reference = "GAG".to_string();
        anchored.alternate = "G".to_string();
        engine.fold_lab("lab1", &[anchored]).unwrap();

        let record = engine.get("11_108098576_GAG_G_ATM").unwrap();
        assert_eq!(record.key.reference, "GAG");
        assert_eq!(record.key.alternate, "G");
        assert_eq!(record.variant_type, VariantType::Del);
    }

    #[test]
    fn test_invalid_classification_is_fatal() {
        let mut engine = ConsensusEngine::new();
        let err = engine.fold_lab("lab1", &[call("maybe")]).unwrap_err();
        assert_eq!(
            err,
            ConsensusError::InvalidClassification {
                lab: "lab1".to_string(),
                variant: IDENTITY.to_string(),
                value: "maybe".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_allele_is_fatal() {
        let mut engine = ConsensusEngine::new();
        let mut bad = call("b");
        bad.reference = String::new();
        bad.alternate = String::new();
        assert!(matches!(
            engine.fold_lab("lab1", &[bad]),
            Err(ConsensusError::MalformedAllele { .. })
        ));

        let mut same = call("b");
        same.reference = "GG".to_string();
        same.alternate = "GG".to_string();
        assert!(matches!(
            engine.fold_lab("lab1", &[same]),
            Err(ConsensusError::MalformedAllele { .. })
        ));
    }

    #[test]
    fn test_descriptive_fields_backfilled() {
        let mut engine = ConsensusEngine::new();
        let mut bare = call("b");
        bare.transcript = None;
        bare.c_dna = None;
        engine.fold_lab("lab1", &[bare]).unwrap();
        engine.fold_lab("lab2", &[call("lb")]).unwrap();

        let record = engine.get(IDENTITY).unwrap();
        assert_eq!(record.transcript.as_deref(), Some("NM_000051.3"));
        assert_eq!(record.c_dna.as_deref(), Some("c.146C>G"));
    }

    #[test]
    fn test_finish_is_sorted_by_identity() {
        let mut engine = ConsensusEngine::new();
        let mut second = call("b");
        second.chromosome = "2".to_string();
        let mut first = call("b");
        first.chromosome = "1".to_string();
        engine.fold_lab("lab1", &[second, first]).unwrap();

        let records = engine.finish();
        assert_eq!(records.len(), 2);
        assert!(records[0].key.identity_string() < records[1].key.identity_string());
    }
}
