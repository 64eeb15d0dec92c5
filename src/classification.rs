//! Classification vocabularies and the consensus predicates over tallies.
//!
//! Labs submit a 5-tier classification (b/lb/vus/lp/p). Consensus collapses
//! the likely/non-likely distinction into a 3-tier vocabulary, and the
//! public table uses a further abbreviated form. The conflict and
//! no-consensus predicates are deliberately separate: a benign/pathogenic
//! conflict without VUS is *not* "no consensus", and the engine resolves
//! their overlap by checking conflict first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 5-tier classification as submitted by a lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    /// Benign (`b`).
    Benign,
    /// Likely benign (`lb`).
    LikelyBenign,
    /// Variant of uncertain significance (`vus`).
    Vus,
    /// Likely pathogenic (`lp`).
    LikelyPathogenic,
    /// Pathogenic (`p`).
    Pathogenic,
}

impl Classification {
    /// Parse a lab-submitted tier code. Returns `None` for anything outside
    /// the closed vocabulary; the caller turns that into a fatal
    /// `InvalidClassification` with lab/variant context.
    pub fn from_code(code: &str) -> Option<Classification> {
        match code.trim().to_ascii_lowercase().as_str() {
            "b" | "benign" => Some(Classification::Benign),
            "lb" | "likely benign" => Some(Classification::LikelyBenign),
            "vus" | "uncertain significance" => Some(Classification::Vus),
            "lp" | "likely pathogenic" => Some(Classification::LikelyPathogenic),
            "p" | "pathogenic" => Some(Classification::Pathogenic),
            _ => None,
        }
    }

    /// Short tier code (`b`, `lb`, `vus`, `lp`, `p`).
    pub fn code(&self) -> &'static str {
        match self {
            Classification::Benign => "b",
            Classification::LikelyBenign => "lb",
            Classification::Vus => "vus",
            Classification::LikelyPathogenic => "lp",
            Classification::Pathogenic => "p",
        }
    }

    /// Full display label, e.g. `lb` -> "Likely benign".
    pub fn full_label(&self) -> &'static str {
        match self {
            Classification::Benign => "Benign",
            Classification::LikelyBenign => "Likely benign",
            Classification::Vus => "VUS",
            Classification::LikelyPathogenic => "Likely pathogenic",
            Classification::Pathogenic => "Pathogenic",
        }
    }

    /// Collapse into the 3-tier consensus label.
    pub fn consensus_label(&self) -> ConsensusLabel {
        match self {
            Classification::Benign | Classification::LikelyBenign => ConsensusLabel::LikelyBenign,
            Classification::Vus => ConsensusLabel::Vus,
            Classification::Pathogenic | Classification::LikelyPathogenic => {
                ConsensusLabel::LikelyPathogenic
            }
        }
    }

    /// Benign-leaning tier.
    pub fn is_benign(&self) -> bool {
        matches!(self, Classification::Benign | Classification::LikelyBenign)
    }

    /// Pathogenic-leaning tier.
    pub fn is_pathogenic(&self) -> bool {
        matches!(
            self,
            Classification::Pathogenic | Classification::LikelyPathogenic
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Consensus classification of a variant across all labs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConsensusLabel {
    /// Exactly one lab classified the variant.
    ClassifiedByOneLab,
    /// All classifying labs agree on (likely) benign.
    LikelyBenign,
    /// All classifying labs agree on VUS.
    Vus,
    /// All classifying labs agree on (likely) pathogenic.
    LikelyPathogenic,
    /// VUS coexists with a definitive tier, without an outright conflict.
    NoConsensus,
    /// Both benign-leaning and pathogenic-leaning tiers are present.
    OppositeClassifications,
}

impl ConsensusLabel {
    /// Display label as used in the consensus table.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusLabel::ClassifiedByOneLab => "Classified by one lab",
            ConsensusLabel::LikelyBenign => "(Likely) benign",
            ConsensusLabel::Vus => "VUS",
            ConsensusLabel::LikelyPathogenic => "(Likely) pathogenic",
            ConsensusLabel::NoConsensus => "No consensus",
            ConsensusLabel::OppositeClassifications => "Opposite classifications",
        }
    }

    /// True for the three labels where every classifying lab agrees.
    pub fn is_tier(&self) -> bool {
        matches!(
            self,
            ConsensusLabel::LikelyBenign | ConsensusLabel::Vus | ConsensusLabel::LikelyPathogenic
        )
    }

    /// Whether the match count is surfaced for this label. One lab always
    /// agrees with itself, so `Classified by one lab` counts as support.
    pub fn shows_match_count(&self) -> bool {
        self.is_tier() || *self == ConsensusLabel::ClassifiedByOneLab
    }
}

impl fmt::Display for ConsensusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConsensusLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Classified by one lab" => Ok(ConsensusLabel::ClassifiedByOneLab),
            "(Likely) benign" => Ok(ConsensusLabel::LikelyBenign),
            "VUS" => Ok(ConsensusLabel::Vus),
            "(Likely) pathogenic" => Ok(ConsensusLabel::LikelyPathogenic),
            "No consensus" => Ok(ConsensusLabel::NoConsensus),
            "Opposite classifications" => Ok(ConsensusLabel::OppositeClassifications),
            other => Err(format!("unknown consensus classification '{other}'")),
        }
    }
}

/// Abbreviated classification for the public consensus table.
///
/// The mapping from full labels is deliberately lossy: the likely/non-likely
/// distinction is dropped, so "Benign", "Likely benign" and "(Likely) benign"
/// all abbreviate to `LB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublicClassification {
    /// (Likely) benign.
    Lb,
    /// Variant of uncertain significance.
    Vus,
    /// (Likely) pathogenic.
    Lp,
}

impl PublicClassification {
    /// Map a full classification label to its abbreviation, stripping the
    /// "(likely)" qualifier case-insensitively first.
    pub fn from_label(label: &str) -> Option<PublicClassification> {
        let lower = label.to_ascii_lowercase();
        let stripped = lower
            .trim()
            .trim_start_matches("(likely)")
            .trim_start_matches("likely")
            .trim();
        match stripped {
            "benign" => Some(PublicClassification::Lb),
            "vus" => Some(PublicClassification::Vus),
            "pathogenic" => Some(PublicClassification::Lp),
            _ => None,
        }
    }

    /// Abbreviation as printed in the public table.
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicClassification::Lb => "LB",
            PublicClassification::Vus => "VUS",
            PublicClassification::Lp => "LP",
        }
    }
}

impl fmt::Display for PublicClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running 5-tier counts for one variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub benign: u32,
    pub likely_benign: u32,
    pub vus: u32,
    pub likely_pathogenic: u32,
    pub pathogenic: u32,
}

impl Tally {
    /// Record one classification.
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Benign => self.benign += 1,
            Classification::LikelyBenign => self.likely_benign += 1,
            Classification::Vus => self.vus += 1,
            Classification::LikelyPathogenic => self.likely_pathogenic += 1,
            Classification::Pathogenic => self.pathogenic += 1,
        }
    }

    /// Count for one tier.
    pub fn count(&self, classification: Classification) -> u32 {
        match classification {
            Classification::Benign => self.benign,
            Classification::LikelyBenign => self.likely_benign,
            Classification::Vus => self.vus,
            Classification::LikelyPathogenic => self.likely_pathogenic,
            Classification::Pathogenic => self.pathogenic,
        }
    }

    /// Total number of recorded classifications.
    pub fn total(&self) -> u32 {
        self.benign + self.likely_benign + self.vus + self.likely_pathogenic + self.pathogenic
    }

    /// Conflicting iff both benign-leaning and pathogenic-leaning tiers are
    /// present. Monotone: once true, further records cannot unset it.
    pub fn is_conflicting(&self) -> bool {
        (self.benign > 0 || self.likely_benign > 0)
            && (self.likely_pathogenic > 0 || self.pathogenic > 0)
    }

    /// No consensus iff VUS coexists with any definitive tier. Orthogonal to
    /// [`Tally::is_conflicting`]; a pure benign/pathogenic conflict without
    /// VUS is not flagged here.
    pub fn is_no_consensus(&self) -> bool {
        self.vus > 0
            && (self.benign > 0
                || self.likely_benign > 0
                || self.likely_pathogenic > 0
                || self.pathogenic > 0)
    }
}
