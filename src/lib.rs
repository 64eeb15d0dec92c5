//! ferro-consensus: multi-lab variant classification consensus
//!
//! Reconciles variant pathogenicity classifications submitted by independent
//! clinical laboratories into one consensus classification per genomic
//! variant, tracks each variant's identity across prior export snapshots
//! despite notation drift, and derives the public and audit report tables.
//!
//! # Example
//!
//! ```
//! use ferro_consensus::{ConsensusEngine, ConsensusLabel, LabCall};
//!
//! let call = LabCall {
//!     chromosome: "11".to_string(),
//!     start: 108167858,
//!     reference: "T".to_string(),
//!     alternate: "A".to_string(),
//!     gene: "ATM".to_string(),
//!     classification: "lp".to_string(),
//!     ..LabCall::default()
//! };
//!
//! let mut engine = ConsensusEngine::new();
//! engine.fold_lab("lab1", std::slice::from_ref(&call)).unwrap();
//! engine.fold_lab("lab2", &[call]).unwrap();
//!
//! let records = engine.finish();
//! assert_eq!(records[0].classification, ConsensusLabel::LikelyPathogenic);
//! ```

pub mod allele;
pub mod classification;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod history;
pub mod pipeline;
pub mod report;
pub mod retrieve;
pub mod variant;

// Re-export commonly used types
pub use allele::{simplify, VariantType, ABSENT_ALLELE};
pub use classification::{Classification, ConsensusLabel, PublicClassification, Tally};
pub use config::RunConfig;
pub use engine::ConsensusEngine;
pub use error::ConsensusError;
pub use export::Exporter;
pub use history::{attach_history, candidate_ids, HistoryRecord, HistoryStore, IdCorrection};
pub use pipeline::{run, rerun_reports, RunSummary};
pub use report::ReportAggregator;
pub use retrieve::{retrieve_all, LabDataSource, TsvSource};
pub use variant::{variant_id, ConsensusRecord, LabCall, VariantKey};

/// Result type alias for ferro-consensus operations
pub type Result<T> = std::result::Result<T, ConsensusError>;
