//! Phenopacket wire/boundary support for the SAMS client.
//!
//! This crate provides **typed records** and **pure transforms** for phenopacket documents
//! exported by the SAMS phenotype-annotation service:
//! - JSON wire models (GA4GH Phenopacket schema v2, the subset SAMS exports)
//! - translation between the wire models and typed domain records
//! - HPO / disease term extraction into flat textual summaries
//! - onset-based filtering of features and diseases
//!
//! Nothing in this crate touches the network or the filesystem. Every transform takes a
//! document by reference and returns a new value, so the caller's document stays valid for reuse.

pub mod document;
pub mod filter;
pub mod onset;
pub mod terms;

// Re-export facades
pub use document::{Disease, OntologyClass, Phenopacket, PhenotypicFeature, Subject};
pub use filter::{filter_phenopacket_by_onset, OnsetSelector};
pub use onset::{AgeDuration, Onset};
pub use terms::{
    extract_disease_terms_from_phenopacket, extract_disease_terms_with,
    extract_hpo_terms_from_phenopacket, extract_hpo_terms_with, ExtractOptions,
};

/// Errors returned by the `phenopacket` crate.
#[derive(Debug, thiserror::Error)]
pub enum PhenopacketError {
    /// The JSON did not match the phenopacket wire schema.
    #[error("translation error: {0}")]
    Translation(String),

    /// A sequence the operation needs is not present on the document.
    #[error("phenopacket {subject} has no {sequence}")]
    MissingSequence {
        subject: String,
        sequence: &'static str,
    },

    /// Two onset values cannot be ordered against each other.
    #[error("onset values {left} and {right} are not comparable")]
    IncomparableOnsets { left: String, right: String },

    #[error("invalid onset value: {0}")]
    InvalidOnset(String),
}

/// Type alias for Results that can fail with a [`PhenopacketError`].
pub type PhenopacketResult<T> = Result<T, PhenopacketError>;
