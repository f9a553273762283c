//! Phenopacket wire models and typed domain records.
//!
//! This module provides both domain-level types and wire models for phenopacket documents as
//! SAMS exports them.
//!
//! Responsibilities:
//! - Define public domain-level types that the extractor and filter operate on
//! - Define a JSON wire model for serialisation/deserialisation
//! - Translate between the two, validating the fields the transforms rely on
//!
//! Notes:
//! - Keys this crate does not interpret are carried verbatim in `other` maps and re-emitted on
//!   render, so a filtered document keeps every document-level attribute of its input.
//! - `phenotypicFeatures` and `diseases` stay `None` when the key is absent; an empty array is
//!   `Some(vec![])`.

use crate::onset::Onset;
use crate::{PhenopacketError, PhenopacketResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Public domain-level types
// ============================================================================

/// An ontology term: an identifier such as `HP:0001250` or `OMIM:154700` plus its label.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct OntologyClass {
    pub id: String,
    pub label: String,
}

/// The individual a phenopacket describes.
#[derive(Clone, Debug, PartialEq)]
pub struct Subject {
    /// External patient identifier used by SAMS.
    pub id: String,
    /// Remaining subject attributes, carried unchanged.
    pub other: Map<String, Value>,
}

/// An observed (or explicitly excluded) phenotype.
#[derive(Clone, Debug, PartialEq)]
pub struct PhenotypicFeature {
    /// The HPO term (`type` on the wire).
    pub term: OntologyClass,
    /// The phenotype was looked for and found absent.
    pub excluded: bool,
    pub onset: Option<Onset>,
    pub other: Map<String, Value>,
}

/// A diagnosed (or explicitly excluded) disease, coded in OMIM or ORPHANET.
#[derive(Clone, Debug, PartialEq)]
pub struct Disease {
    pub term: OntologyClass,
    pub excluded: bool,
    pub onset: Option<Onset>,
    pub other: Map<String, Value>,
}

/// One patient's phenopacket.
#[derive(Clone, Debug, PartialEq)]
pub struct Phenopacket {
    pub id: Option<String>,
    pub subject: Option<Subject>,
    pub phenotypic_features: Option<Vec<PhenotypicFeature>>,
    pub diseases: Option<Vec<Disease>>,
    /// Remaining document-level attributes (metaData, interpretations, ...), carried unchanged.
    pub other: Map<String, Value>,
}

// ============================================================================
// Public Phenopacket operations
// ============================================================================

impl Phenopacket {
    /// Parse a single phenopacket from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface the path (e.g. `phenotypicFeatures[1].type.id`)
    /// to the failing field when the JSON does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`PhenopacketError`] if:
    /// - the text is not valid JSON,
    /// - a recognised field has an unexpected type or is missing a required key.
    ///
    /// An onset that cannot be read is kept as [`Onset::Unrecognised`] and logged, not rejected.
    pub fn parse(json_text: &str) -> PhenopacketResult<Phenopacket> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let wire = serde_path_to_error::deserialize::<_, PhenopacketWire>(&mut deserializer)
            .map_err(|err| schema_mismatch("Phenopacket", err))?;
        deserializer
            .end()
            .map_err(|e| PhenopacketError::Translation(format!("trailing data: {e}")))?;

        Ok(wire_to_domain(wire))
    }

    /// Parse a JSON array of phenopackets, as returned by the SAMS bulk export.
    pub fn parse_many(json_text: &str) -> PhenopacketResult<Vec<Phenopacket>> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let wires = serde_path_to_error::deserialize::<_, Vec<PhenopacketWire>>(&mut deserializer)
            .map_err(|err| schema_mismatch("Phenopacket list", err))?;
        deserializer
            .end()
            .map_err(|e| PhenopacketError::Translation(format!("trailing data: {e}")))?;

        Ok(wires.into_iter().map(wire_to_domain).collect())
    }

    /// Build a phenopacket from an already-decoded JSON value.
    pub fn from_value(value: Value) -> PhenopacketResult<Phenopacket> {
        let wire = serde_path_to_error::deserialize::<_, PhenopacketWire>(value)
            .map_err(|err| schema_mismatch("Phenopacket", err))?;
        Ok(wire_to_domain(wire))
    }

    /// Render the phenopacket as a JSON value.
    pub fn to_value(&self) -> PhenopacketResult<Value> {
        serde_json::to_value(domain_to_wire(self))
            .map_err(|e| PhenopacketError::Translation(format!("Failed to serialise phenopacket: {e}")))
    }

    /// Render the phenopacket as pretty-printed JSON text.
    pub fn render(&self) -> PhenopacketResult<String> {
        serde_json::to_string_pretty(&domain_to_wire(self))
            .map_err(|e| PhenopacketError::Translation(format!("Failed to serialise phenopacket: {e}")))
    }

    /// The subject's external identifier, if the document has a subject.
    pub fn subject_id(&self) -> Option<&str> {
        self.subject.as_ref().map(|s| s.id.as_str())
    }

    /// A name for the document in log lines and error messages.
    pub fn display_id(&self) -> &str {
        self.subject_id()
            .or(self.id.as_deref())
            .unwrap_or("<unidentified>")
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
struct PhenopacketWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectWire>,

    #[serde(
        rename = "phenotypicFeatures",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub phenotypic_features: Option<Vec<PhenotypicFeatureWire>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diseases: Option<Vec<DiseaseWire>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct SubjectWire {
    pub id: String,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct PhenotypicFeatureWire {
    #[serde(rename = "type")]
    pub term: OntologyClass,

    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub excluded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onset: Option<Value>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct DiseaseWire {
    pub term: OntologyClass,

    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub excluded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onset: Option<Value>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// SAMS has emitted `excluded` as a boolean, as `0`/`1` and as `null`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagWire {
    Bool(bool),
    Int(i64),
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FlagWire>::deserialize(deserializer)? {
        Some(FlagWire::Bool(flag)) => flag,
        Some(FlagWire::Int(n)) => n != 0,
        None => false,
    })
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn schema_mismatch(
    what: &str,
    err: serde_path_to_error::Error<serde_json::Error>,
) -> PhenopacketError {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() || path == "." {
        "<root>"
    } else {
        path.as_str()
    };
    PhenopacketError::Translation(format!("{what} schema mismatch at {path}: {source}"))
}

/// Interpret an entry's onset, keeping text that cannot be read as an uninterpreted value.
fn onset_from_wire(onset: Option<Value>, sequence: &str, index: usize) -> Option<Onset> {
    let value = onset.filter(|value| !value.is_null())?;
    match Onset::from_wire(value.clone()) {
        Ok(onset) => Some(onset),
        Err(e) => {
            tracing::warn!("{}[{}].onset kept uninterpreted: {}", sequence, index, e);
            Some(Onset::Unrecognised(value))
        }
    }
}

/// Convert wire format phenopacket to domain types.
fn wire_to_domain(wire: PhenopacketWire) -> Phenopacket {
    let phenotypic_features = wire.phenotypic_features.map(|features| {
        features
            .into_iter()
            .enumerate()
            .map(|(index, f)| PhenotypicFeature {
                term: f.term,
                excluded: f.excluded,
                onset: onset_from_wire(f.onset, "phenotypicFeatures", index),
                other: f.other,
            })
            .collect()
    });

    let diseases = wire.diseases.map(|diseases| {
        diseases
            .into_iter()
            .enumerate()
            .map(|(index, d)| Disease {
                term: d.term,
                excluded: d.excluded,
                onset: onset_from_wire(d.onset, "diseases", index),
                other: d.other,
            })
            .collect()
    });

    Phenopacket {
        id: wire.id,
        subject: wire.subject.map(|s| Subject {
            id: s.id,
            other: s.other,
        }),
        phenotypic_features,
        diseases,
        other: wire.other,
    }
}

/// Convert domain types to wire format phenopacket.
fn domain_to_wire(data: &Phenopacket) -> PhenopacketWire {
    PhenopacketWire {
        id: data.id.clone(),
        subject: data.subject.as_ref().map(|s| SubjectWire {
            id: s.id.clone(),
            other: s.other.clone(),
        }),
        phenotypic_features: data.phenotypic_features.as_ref().map(|features| {
            features
                .iter()
                .map(|f| PhenotypicFeatureWire {
                    term: f.term.clone(),
                    excluded: f.excluded,
                    onset: f.onset.as_ref().map(Onset::to_wire),
                    other: f.other.clone(),
                })
                .collect()
        }),
        diseases: data.diseases.as_ref().map(|diseases| {
            diseases
                .iter()
                .map(|d| DiseaseWire {
                    term: d.term.clone(),
                    excluded: d.excluded,
                    onset: d.onset.as_ref().map(Onset::to_wire),
                    other: d.other.clone(),
                })
                .collect()
        }),
        other: data.other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
  "id": "pp-1",
  "subject": { "id": "TREX1", "sex": "FEMALE" },
  "phenotypicFeatures": [
    {
      "type": { "id": "HP:0002076", "label": "Migraine" },
      "onset": { "age": { "iso8601duration": "P3Y" } }
    },
    {
      "type": { "id": "HP:0031589", "label": "Suicide behaviors" },
      "excluded": true,
      "onset": { "timestamp": "2026-02-12T00:00:00Z" },
      "evidence": [{ "evidenceCode": { "id": "ECO:0000033", "label": "author statement" } }]
    }
  ],
  "metaData": { "createdBy": "SAMS" }
}"#;

    #[test]
    fn parses_sample_document() {
        let doc = Phenopacket::parse(SAMPLE).expect("parse json");
        assert_eq!(doc.subject_id(), Some("TREX1"));
        assert!(doc.diseases.is_none());

        let features = doc.phenotypic_features.as_ref().expect("features present");
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].term.id, "HP:0002076");
        assert!(!features[0].excluded);
        assert!(features[1].excluded);
        assert!(features[1].other.contains_key("evidence"));
        assert!(doc.other.contains_key("metaData"));
    }

    #[test]
    fn render_keeps_carried_keys() {
        let doc = Phenopacket::parse(SAMPLE).expect("parse json");
        let value = doc.to_value().expect("render");

        assert_eq!(value["subject"]["sex"], json!("FEMALE"));
        assert_eq!(value["metaData"]["createdBy"], json!("SAMS"));
        assert_eq!(
            value["phenotypicFeatures"][1]["onset"],
            json!({ "timestamp": "2026-02-12T00:00:00Z" })
        );
        assert!(value.get("diseases").is_none());

        let reparsed = Phenopacket::from_value(value).expect("reparse");
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn accepts_numeric_excluded_flag() {
        let doc = Phenopacket::from_value(json!({
            "subject": { "id": "p1" },
            "phenotypicFeatures": [
                { "type": { "id": "HP:0000001", "label": "Phenotype 1" }, "excluded": 0 },
                { "type": { "id": "HP:0000002", "label": "Phenotype 2" }, "excluded": 1 }
            ]
        }))
        .expect("parse");

        let features = doc.phenotypic_features.expect("features");
        assert!(!features[0].excluded);
        assert!(features[1].excluded);
    }

    #[test]
    fn schema_mismatch_reports_path() {
        let err = Phenopacket::from_value(json!({
            "phenotypicFeatures": [
                { "type": { "id": "HP:0000001", "label": "Phenotype 1" } },
                { "type": { "label": "no id" } }
            ]
        }))
        .expect_err("should reject missing id");

        match err {
            PhenopacketError::Translation(msg) => {
                assert!(msg.contains("phenotypicFeatures[1]"), "{msg}");
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_onset_is_kept_uninterpreted() {
        let doc = Phenopacket::from_value(json!({
            "diseases": [
                { "term": { "id": "OMIM:1", "label": "D1" }, "onset": { "timestamp": "soon" } }
            ]
        }))
        .expect("unreadable onset is not fatal");

        let diseases = doc.diseases.as_ref().expect("diseases");
        assert_eq!(
            diseases[0].onset,
            Some(Onset::Unrecognised(json!({ "timestamp": "soon" })))
        );
        assert_eq!(
            doc.to_value().expect("render")["diseases"][0]["onset"],
            json!({ "timestamp": "soon" })
        );
    }

    #[test]
    fn bulk_export_survives_one_unreadable_onset() {
        let docs = Phenopacket::parse_many(
            r#"[
              { "subject": { "id": "a" },
                "phenotypicFeatures": [
                  { "type": { "id": "HP:1", "label": "A" }, "onset": { "timestamp": "2020-01-01" } }
                ] },
              { "subject": { "id": "b" },
                "phenotypicFeatures": [
                  { "type": { "id": "HP:2", "label": "B" },
                    "onset": { "age": { "iso8601duration": "P1.5Y" } },
                    "excluded": null }
                ] }
            ]"#,
        )
        .expect("one bad onset does not lose the export");

        assert_eq!(docs.len(), 2);
        let feature = &docs[1].phenotypic_features.as_ref().expect("features")[0];
        assert!(matches!(feature.onset, Some(Onset::Unrecognised(_))));
        assert!(!feature.excluded);
    }

    #[test]
    fn parses_bulk_export() {
        let docs = Phenopacket::parse_many(r#"[{"subject":{"id":"a"}},{"subject":{"id":"b"}}]"#)
            .expect("parse list");
        let ids: Vec<_> = docs.iter().map(Phenopacket::display_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn rejects_non_array_bulk_export() {
        assert!(Phenopacket::parse_many(r#"{"subject":{"id":"a"}}"#).is_err());
    }

    #[test]
    fn display_id_falls_back() {
        let doc = Phenopacket::from_value(json!({ "id": "pp-9" })).expect("parse");
        assert_eq!(doc.display_id(), "pp-9");
        let doc = Phenopacket::from_value(json!({})).expect("parse");
        assert_eq!(doc.display_id(), "<unidentified>");
    }
}
