use crate::core::{ConceptDocument, ConfigProvider, IngestPlan, IngestReport, Pipeline};
use crate::domain::model::{RelatedEdge, SubconceptEdge};
use crate::store;
use crate::utils::error::{ConceptsError, Result};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Builds the SQLite cache from the downloaded concept documents.
pub struct ConceptPipeline {
    concepts_dir: PathBuf,
    database_path: PathBuf,
}

impl ConceptPipeline {
    pub fn new(concepts_dir: impl Into<PathBuf>, database_path: impl Into<PathBuf>) -> Self {
        Self {
            concepts_dir: concepts_dir.into(),
            database_path: database_path.into(),
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        let concepts_dir =
            Path::new(config.download_dir()).join(config.prefix().trim_end_matches('/'));
        Self::new(concepts_dir, config.database_path())
    }

    fn document_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.concepts_dir.is_dir() {
            return Err(ConceptsError::ConfigError {
                message: format!(
                    "no downloaded documents at {}, run `concepts fetch` first",
                    self.concepts_dir.display()
                ),
            });
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.concepts_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[async_trait::async_trait]
impl Pipeline for ConceptPipeline {
    async fn extract(&self) -> Result<Vec<ConceptDocument>> {
        let paths = self.document_paths()?;
        tracing::debug!(
            "Reading {} documents from {}",
            paths.len(),
            self.concepts_dir.display()
        );

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = tokio::fs::read(&path).await?;
            let document = serde_json::from_slice::<ConceptDocument>(&raw).map_err(|source| {
                ConceptsError::DocumentError {
                    path: path.display().to_string(),
                    source,
                }
            })?;
            documents.push(document);
        }

        if documents.is_empty() {
            tracing::warn!(
                "No concept documents found in {}",
                self.concepts_dir.display()
            );
        }
        Ok(documents)
    }

    async fn transform(&self, documents: Vec<ConceptDocument>) -> Result<IngestPlan> {
        Ok(plan_ingest(documents))
    }

    async fn load(&self, plan: IngestPlan) -> Result<IngestReport> {
        let database_path = self.database_path.clone();
        let report = tokio::task::spawn_blocking(move || write_plan(&database_path, plan))
            .await
            .map_err(|e| ConceptsError::processing(format!("database writer failed: {}", e)))??;

        tracing::info!(
            "Loaded {} concepts ({} duplicates ignored), {} subconcept and {} related relations into {}",
            report.concepts,
            report.duplicates,
            report.subconcept_relations,
            report.related_relations,
            self.database_path.display()
        );
        if !report.missing_concepts.is_empty() {
            tracing::warn!(
                "Found {} missing concept IDs:",
                report.missing_concepts.len()
            );
            for concept_id in &report.missing_concepts {
                tracing::warn!("  - {}", concept_id);
            }
        }
        Ok(report)
    }
}

/// Deduplicates concepts (first wins) and resolves relations against the
/// concept set. Relations to unknown ids are dropped and the ids recorded.
pub fn plan_ingest(documents: Vec<ConceptDocument>) -> IngestPlan {
    let mut plan = IngestPlan {
        files: documents.len(),
        ..Default::default()
    };

    let mut known = HashSet::with_capacity(documents.len());
    for document in &documents {
        if known.insert(document.concept.wikibase_id.clone()) {
            plan.concepts.push(document.concept.clone());
        } else {
            tracing::debug!("Duplicate concept {}", document.concept.wikibase_id);
            plan.duplicates += 1;
        }
    }

    let mut subconcepts = BTreeSet::new();
    let mut related = BTreeSet::new();

    for document in documents {
        let id = document.concept.wikibase_id;

        for parent in document.subconcept_of {
            if parent == id {
                tracing::debug!("Ignoring self-referencing subconcept edge on {}", id);
                continue;
            }
            if !known.contains(&parent) {
                plan.missing_concepts.insert(parent);
                continue;
            }
            subconcepts.insert(SubconceptEdge {
                concept_id: parent,
                subconcept_id: id.clone(),
            });
        }

        for other in document.related_concepts {
            if !known.contains(&other) {
                plan.missing_concepts.insert(other);
                continue;
            }
            if let Some(edge) = RelatedEdge::normalized(&id, &other) {
                related.insert(edge);
            }
        }
    }

    plan.subconcept_relations = subconcepts.into_iter().collect();
    plan.related_relations = related.into_iter().collect();
    plan
}

fn write_plan(database_path: &Path, plan: IngestPlan) -> Result<IngestReport> {
    let mut conn = store::open_read_write(database_path)?;
    let tx = conn.transaction()?;

    store::recreate_schema(&tx)?;

    let mut report = IngestReport {
        files: plan.files,
        duplicates: plan.duplicates,
        missing_concepts: plan.missing_concepts,
        ..Default::default()
    };

    for concept in &plan.concepts {
        if store::insert_concept(&tx, concept)? {
            report.concepts += 1;
        }
    }
    for edge in &plan.subconcept_relations {
        if store::insert_subconcept_relation(&tx, edge)? {
            report.subconcept_relations += 1;
        }
    }
    for edge in &plan.related_relations {
        if store::insert_related_relation(&tx, edge)? {
            report.related_relations += 1;
        }
    }

    tx.commit()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Concept;

    fn doc(id: &str, parents: &[&str], related: &[&str]) -> ConceptDocument {
        ConceptDocument {
            concept: Concept {
                wikibase_id: id.to_string(),
                preferred_label: format!("label {id}"),
                alternative_labels: vec![],
                negative_labels: vec![],
                description: None,
                definition: None,
                labelled_passages: serde_json::json!([]),
            },
            subconcept_of: parents.iter().map(|s| s.to_string()).collect(),
            related_concepts: related.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_first_duplicate_wins() {
        let mut second = doc("Q1", &[], &[]);
        second.concept.preferred_label = "replacement".to_string();

        let plan = plan_ingest(vec![doc("Q1", &[], &[]), second]);
        assert_eq!(plan.files, 2);
        assert_eq!(plan.concepts.len(), 1);
        assert_eq!(plan.concepts[0].preferred_label, "label Q1");
        assert_eq!(plan.duplicates, 1);
    }

    #[test]
    fn test_subconcept_edges_point_parent_to_child() {
        let plan = plan_ingest(vec![doc("Q1", &[], &[]), doc("Q2", &["Q1"], &[])]);
        assert_eq!(
            plan.subconcept_relations,
            vec![SubconceptEdge {
                concept_id: "Q1".to_string(),
                subconcept_id: "Q2".to_string(),
            }]
        );
    }

    #[test]
    fn test_related_edges_are_symmetric_and_deduplicated() {
        // Q2 -> Q1 only listed from the greater id still yields one edge
        let plan = plan_ingest(vec![
            doc("Q1", &[], &[]),
            doc("Q2", &[], &["Q1", "Q2"]),
            doc("Q3", &[], &["Q1"]),
            doc("Q1", &[], &["Q3"]),
        ]);
        assert_eq!(
            plan.related_relations,
            vec![
                RelatedEdge::normalized("Q1", "Q2").unwrap(),
                RelatedEdge::normalized("Q1", "Q3").unwrap(),
            ]
        );
    }

    #[test]
    fn test_missing_references_are_collected() {
        let plan = plan_ingest(vec![
            doc("Q1", &["Q404"], &["Q500"]),
            doc("Q2", &["Q404"], &[]),
        ]);
        assert!(plan.subconcept_relations.is_empty());
        assert!(plan.related_relations.is_empty());
        assert_eq!(
            plan.missing_concepts.into_iter().collect::<Vec<_>>(),
            vec!["Q404".to_string(), "Q500".to_string()]
        );
    }
}
