use crate::utils::error::Result;
use rusqlite::Connection;

const DROP_SQL: &str = "
DROP TABLE IF EXISTS concept_related_relations;
DROP TABLE IF EXISTS concept_subconcept_relations;
DROP TABLE IF EXISTS concepts;
";

// List columns hold JSON arrays, labelled_passages holds arbitrary JSON.
const CREATE_SQL: &str = "
CREATE TABLE concepts (
    wikibase_id TEXT PRIMARY KEY,
    preferred_label TEXT NOT NULL,
    alternative_labels TEXT NOT NULL,
    negative_labels TEXT NOT NULL,
    description TEXT,
    definition TEXT,
    labelled_passages TEXT NOT NULL
);

CREATE INDEX idx_concepts_preferred_label
    ON concepts(preferred_label COLLATE NOCASE);

CREATE TABLE concept_subconcept_relations (
    concept_id TEXT NOT NULL REFERENCES concepts(wikibase_id),
    subconcept_id TEXT NOT NULL REFERENCES concepts(wikibase_id),
    UNIQUE(concept_id, subconcept_id)
);

CREATE INDEX idx_subconcept_child
    ON concept_subconcept_relations(subconcept_id);

CREATE TABLE concept_related_relations (
    concept_id1 TEXT NOT NULL REFERENCES concepts(wikibase_id),
    concept_id2 TEXT NOT NULL REFERENCES concepts(wikibase_id),
    UNIQUE(concept_id1, concept_id2),
    CHECK(concept_id1 < concept_id2)
);

CREATE INDEX idx_related_second
    ON concept_related_relations(concept_id2);
";

/// Drops and recreates every table. Callers run this inside the build
/// transaction so a failed build leaves the previous data in place.
pub fn recreate_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(DROP_SQL)?;
    conn.execute_batch(CREATE_SQL)?;
    Ok(())
}
