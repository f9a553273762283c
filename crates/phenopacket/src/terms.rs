//! Term extraction.
//!
//! Flattens the coded terms of a phenopacket into one line of text, for example
//! `"HP:0000001 - Phenotype 1; HP:0000002 - Phenotype 2"`. Entries keep their document order.

use crate::document::{OntologyClass, Phenopacket};
use crate::{PhenopacketError, PhenopacketResult};

const SEPARATOR: &str = "; ";
const EXCLUDED_MARKER: &str = " (excluded)";

/// How excluded entries are treated during extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Skip entries flagged as excluded.
    pub ignore_excluded: bool,
    /// Append `" (excluded)"` to excluded entries that are kept.
    pub mark_excluded: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            ignore_excluded: true,
            mark_excluded: false,
        }
    }
}

impl ExtractOptions {
    pub fn new(ignore_excluded: bool) -> Self {
        Self {
            ignore_excluded,
            ..Self::default()
        }
    }
}

/// Summarise the HPO terms of `phenopacket.phenotypicFeatures`.
///
/// With `ignore_excluded` set, features flagged as excluded are left out. Returns an empty string
/// when nothing is kept.
///
/// # Errors
///
/// Returns [`PhenopacketError::MissingSequence`] if the document has no `phenotypicFeatures`.
pub fn extract_hpo_terms_from_phenopacket(
    phenopacket: &Phenopacket,
    ignore_excluded: bool,
) -> PhenopacketResult<String> {
    extract_hpo_terms_with(phenopacket, ExtractOptions::new(ignore_excluded))
}

/// Summarise the disease terms (OMIM, ORPHANET) of `phenopacket.diseases`.
///
/// Same contract as [`extract_hpo_terms_from_phenopacket`].
pub fn extract_disease_terms_from_phenopacket(
    phenopacket: &Phenopacket,
    ignore_excluded: bool,
) -> PhenopacketResult<String> {
    extract_disease_terms_with(phenopacket, ExtractOptions::new(ignore_excluded))
}

/// [`extract_hpo_terms_from_phenopacket`] with full control over excluded entries.
pub fn extract_hpo_terms_with(
    phenopacket: &Phenopacket,
    options: ExtractOptions,
) -> PhenopacketResult<String> {
    let features = phenopacket
        .phenotypic_features
        .as_deref()
        .ok_or_else(|| missing(phenopacket, "phenotypicFeatures"))?;

    Ok(summarise(
        features.iter().map(|f| (&f.term, f.excluded)),
        options,
    ))
}

/// [`extract_disease_terms_from_phenopacket`] with full control over excluded entries.
pub fn extract_disease_terms_with(
    phenopacket: &Phenopacket,
    options: ExtractOptions,
) -> PhenopacketResult<String> {
    let diseases = phenopacket
        .diseases
        .as_deref()
        .ok_or_else(|| missing(phenopacket, "diseases"))?;

    Ok(summarise(
        diseases.iter().map(|d| (&d.term, d.excluded)),
        options,
    ))
}

fn summarise<'a>(
    entries: impl Iterator<Item = (&'a OntologyClass, bool)>,
    options: ExtractOptions,
) -> String {
    entries
        .filter(|(_, excluded)| !(options.ignore_excluded && *excluded))
        .map(|(term, excluded)| {
            let mut line = format!("{} - {}", term.id, term.label);
            if excluded && options.mark_excluded {
                line.push_str(EXCLUDED_MARKER);
            }
            line
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn missing(phenopacket: &Phenopacket, sequence: &'static str) -> PhenopacketError {
    let subject = phenopacket.display_id().to_owned();
    tracing::warn!("SAMS: no {} found for {}", sequence, subject);
    PhenopacketError::MissingSequence { subject, sequence }
}
