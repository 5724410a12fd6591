use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single concept as stored and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub wikibase_id: String,
    pub preferred_label: String,
    #[serde(default)]
    pub alternative_labels: Vec<String>,
    #[serde(default)]
    pub negative_labels: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub labelled_passages: serde_json::Value,
}

/// The JSON document published per concept in object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptDocument {
    #[serde(flatten)]
    pub concept: Concept,
    /// Ids of the concepts this one is a subconcept of (its parents).
    #[serde(default)]
    pub subconcept_of: Vec<String>,
    #[serde(default)]
    pub related_concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptDetail {
    pub concept: Concept,
    pub related_concepts: Vec<Concept>,
    pub subconcepts: Vec<Concept>,
    pub subconcept_of: Vec<Concept>,
}

/// Directed parent -> child edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubconceptEdge {
    pub concept_id: String,
    pub subconcept_id: String,
}

/// Unordered edge, always stored with `concept_id1 < concept_id2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelatedEdge {
    pub concept_id1: String,
    pub concept_id2: String,
}

impl RelatedEdge {
    /// Returns `None` for self-pairs.
    pub fn normalized(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self {
                concept_id1: a.to_string(),
                concept_id2: b.to_string(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                concept_id1: b.to_string(),
                concept_id2: a.to_string(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Output of the transform phase, ready to be written in one transaction.
#[derive(Debug, Clone, Default)]
pub struct IngestPlan {
    pub files: usize,
    pub concepts: Vec<Concept>,
    pub duplicates: usize,
    pub subconcept_relations: Vec<SubconceptEdge>,
    pub related_relations: Vec<RelatedEdge>,
    pub missing_concepts: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub concepts: usize,
    pub duplicates: usize,
    pub subconcept_relations: usize,
    pub related_relations: usize,
    pub missing_concepts: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub listed: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_defaults_and_unknown_fields() {
        let doc: ConceptDocument = serde_json::from_str(
            r#"{"wikibase_id": "Q1", "preferred_label": "flood", "extra": 3}"#,
        )
        .unwrap();
        assert_eq!(doc.concept.wikibase_id, "Q1");
        assert!(doc.concept.alternative_labels.is_empty());
        assert!(doc.subconcept_of.is_empty());
        assert!(doc.concept.labelled_passages.is_null());
    }

    #[test]
    fn test_related_edge_normalization() {
        let edge = RelatedEdge::normalized("Q9", "Q10").unwrap();
        assert_eq!(edge.concept_id1, "Q10");
        assert_eq!(edge.concept_id2, "Q9");
        assert_eq!(RelatedEdge::normalized("Q10", "Q9"), Some(edge));
        assert!(RelatedEdge::normalized("Q1", "Q1").is_none());
    }
}
