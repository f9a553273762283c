//! Onset filtering.
//!
//! Restricts a phenopacket to the features and diseases whose onset matches a selector. The
//! selector is either a keyword (`earliest`, `latest`) resolved independently per sequence, or a
//! concrete onset value matched exactly.

use crate::document::{Disease, Phenopacket, PhenotypicFeature};
use crate::onset::Onset;
use crate::PhenopacketResult;
use std::cmp::Ordering;
use std::convert::Infallible;
use std::str::FromStr;

/// Which onset to keep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OnsetSelector {
    /// The smallest onset present in each sequence.
    Earliest,
    /// The largest onset present in each sequence.
    Latest,
    /// Entries whose onset equals this value.
    Exact(ExactOnset),
}

/// A concrete onset given as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExactOnset {
    text: String,
    parsed: Option<Onset>,
}

impl ExactOnset {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.trim().to_owned(),
            parsed: Onset::parse_text(text),
        }
    }

    /// Timestamps and ages match by value; any other text matches an onset term by id.
    fn matches(&self, onset: &Onset) -> bool {
        match (&self.parsed, onset) {
            (Some(expected), actual) => expected == actual,
            (None, Onset::Class(class)) => class.id == self.text,
            (None, _) => false,
        }
    }
}

impl FromStr for OnsetSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "earliest" => OnsetSelector::Earliest,
            "latest" => OnsetSelector::Latest,
            other => OnsetSelector::Exact(ExactOnset::new(other)),
        })
    }
}

impl OnsetSelector {
    /// Build a filtered copy of `phenopacket`.
    ///
    /// `phenotypicFeatures` and `diseases` are replaced by their matching entries in original
    /// order; every other attribute is copied. An absent sequence stays absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PhenopacketError::IncomparableOnsets`] when `earliest`/`latest` meets
    /// onset values in one sequence that cannot be ordered against each other.
    pub fn apply(&self, phenopacket: &Phenopacket) -> PhenopacketResult<Phenopacket> {
        let phenotypic_features = phenopacket
            .phenotypic_features
            .as_deref()
            .map(|features| self.retain(features))
            .transpose()?;
        let diseases = phenopacket
            .diseases
            .as_deref()
            .map(|diseases| self.retain(diseases))
            .transpose()?;

        tracing::debug!(
            "onset filter {:?} on {}: {} features, {} diseases kept",
            self,
            phenopacket.display_id(),
            phenotypic_features.as_ref().map_or(0, Vec::len),
            diseases.as_ref().map_or(0, Vec::len),
        );

        Ok(Phenopacket {
            id: phenopacket.id.clone(),
            subject: phenopacket.subject.clone(),
            phenotypic_features,
            diseases,
            other: phenopacket.other.clone(),
        })
    }

    fn retain<T: Timed + Clone>(&self, entries: &[T]) -> PhenopacketResult<Vec<T>> {
        let target = match self {
            OnsetSelector::Earliest => extreme(entries, Ordering::Less)?,
            OnsetSelector::Latest => extreme(entries, Ordering::Greater)?,
            OnsetSelector::Exact(exact) => {
                return Ok(entries
                    .iter()
                    .filter(|entry| entry.onset().is_some_and(|onset| exact.matches(onset)))
                    .cloned()
                    .collect());
            }
        };

        let Some(target) = target else {
            return Ok(Vec::new());
        };

        Ok(entries
            .iter()
            .filter(|entry| entry.onset() == Some(&target))
            .cloned()
            .collect())
    }
}

/// Filter a phenopacket by onset.
///
/// `input_onset_timestamp` is `"earliest"`, `"latest"`, or a concrete onset such as
/// `"2026-02-12T00:00:00Z"` or `"P3Y"`. See [`OnsetSelector::apply`].
pub fn filter_phenopacket_by_onset(
    phenopacket: &Phenopacket,
    input_onset_timestamp: &str,
) -> PhenopacketResult<Phenopacket> {
    let selector = match input_onset_timestamp.parse::<OnsetSelector>() {
        Ok(selector) => selector,
        Err(never) => match never {},
    };
    selector.apply(phenopacket)
}

trait Timed {
    fn onset(&self) -> Option<&Onset>;
}

impl Timed for PhenotypicFeature {
    fn onset(&self) -> Option<&Onset> {
        self.onset.as_ref()
    }
}

impl Timed for Disease {
    fn onset(&self) -> Option<&Onset> {
        self.onset.as_ref()
    }
}

/// The smallest (`Less`) or largest (`Greater`) onset present, ignoring entries without one.
fn extreme<T: Timed>(entries: &[T], wanted: Ordering) -> PhenopacketResult<Option<Onset>> {
    let mut best: Option<&Onset> = None;

    for onset in entries.iter().filter_map(|entry| entry.onset()) {
        best = match best {
            Some(current) if onset.compare(current)? != wanted => Some(current),
            _ => Some(onset),
        };
    }

    Ok(best.cloned())
}
