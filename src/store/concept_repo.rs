use crate::domain::model::{Concept, ConceptDetail, RelatedEdge, SubconceptEdge};
use crate::utils::error::Result;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const CONCEPT_COLUMNS: &str = "c.wikibase_id, c.preferred_label, c.alternative_labels, \
     c.negative_labels, c.description, c.definition, c.labelled_passages";

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_concept(row: &Row<'_>) -> rusqlite::Result<Concept> {
    Ok(Concept {
        wikibase_id: row.get(0)?,
        preferred_label: row.get(1)?,
        alternative_labels: json_column(row, 2)?,
        negative_labels: json_column(row, 3)?,
        description: row.get(4)?,
        definition: row.get(5)?,
        labelled_passages: json_column(row, 6)?,
    })
}

fn query_concepts(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Concept>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let concepts = stmt
        .query_map(params, map_concept)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(concepts)
}

/// Inserts a concept; returns `false` if the id was already present.
pub fn insert_concept(conn: &Connection, concept: &Concept) -> Result<bool> {
    let changed = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO concepts (
                wikibase_id, preferred_label, alternative_labels, negative_labels,
                description, definition, labelled_passages
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?
        .execute(params![
            concept.wikibase_id,
            concept.preferred_label,
            serde_json::to_string(&concept.alternative_labels)?,
            serde_json::to_string(&concept.negative_labels)?,
            concept.description,
            concept.definition,
            serde_json::to_string(&concept.labelled_passages)?,
        ])?;
    Ok(changed == 1)
}

pub fn insert_subconcept_relation(conn: &Connection, edge: &SubconceptEdge) -> Result<bool> {
    let changed = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO concept_subconcept_relations (concept_id, subconcept_id)
             VALUES (?1, ?2)",
        )?
        .execute(params![edge.concept_id, edge.subconcept_id])?;
    Ok(changed == 1)
}

pub fn insert_related_relation(conn: &Connection, edge: &RelatedEdge) -> Result<bool> {
    let changed = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO concept_related_relations (concept_id1, concept_id2)
             VALUES (?1, ?2)",
        )?
        .execute(params![edge.concept_id1, edge.concept_id2])?;
    Ok(changed == 1)
}

pub fn get_concept(conn: &Connection, wikibase_id: &str) -> Result<Option<Concept>> {
    let sql = format!("SELECT {CONCEPT_COLUMNS} FROM concepts c WHERE c.wikibase_id = ?1");
    let concept = conn
        .prepare_cached(&sql)?
        .query_row(params![wikibase_id], map_concept)
        .optional()?;
    Ok(concept)
}

/// Concepts on the other side of every related pair that contains `wikibase_id`.
pub fn related_concepts(conn: &Connection, wikibase_id: &str) -> Result<Vec<Concept>> {
    let sql = format!(
        "SELECT {CONCEPT_COLUMNS} FROM concept_related_relations r
         JOIN concepts c ON c.wikibase_id = CASE
             WHEN r.concept_id1 = ?1 THEN r.concept_id2
             ELSE r.concept_id1
         END
         WHERE r.concept_id1 = ?1 OR r.concept_id2 = ?1
         ORDER BY c.wikibase_id"
    );
    query_concepts(conn, &sql, params![wikibase_id])
}

/// Direct children of `wikibase_id`.
pub fn subconcepts(conn: &Connection, wikibase_id: &str) -> Result<Vec<Concept>> {
    let sql = format!(
        "SELECT {CONCEPT_COLUMNS} FROM concept_subconcept_relations r
         JOIN concepts c ON c.wikibase_id = r.subconcept_id
         WHERE r.concept_id = ?1
         ORDER BY c.wikibase_id"
    );
    query_concepts(conn, &sql, params![wikibase_id])
}

/// Direct parents of `wikibase_id`.
pub fn parent_concepts(conn: &Connection, wikibase_id: &str) -> Result<Vec<Concept>> {
    let sql = format!(
        "SELECT {CONCEPT_COLUMNS} FROM concept_subconcept_relations r
         JOIN concepts c ON c.wikibase_id = r.concept_id
         WHERE r.subconcept_id = ?1
         ORDER BY c.wikibase_id"
    );
    query_concepts(conn, &sql, params![wikibase_id])
}

pub fn get_concept_detail(conn: &Connection, wikibase_id: &str) -> Result<Option<ConceptDetail>> {
    let Some(concept) = get_concept(conn, wikibase_id)? else {
        return Ok(None);
    };

    Ok(Some(ConceptDetail {
        related_concepts: related_concepts(conn, wikibase_id)?,
        subconcepts: subconcepts(conn, wikibase_id)?,
        subconcept_of: parent_concepts(conn, wikibase_id)?,
        concept,
    }))
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Prefix search on `preferred_label`, ASCII case-insensitive.
/// A blank query returns the first `limit` concepts.
pub fn search(conn: &Connection, query: &str, limit: u32) -> Result<Vec<Concept>> {
    if query.is_empty() {
        let sql = format!(
            "SELECT {CONCEPT_COLUMNS} FROM concepts c
             ORDER BY c.preferred_label COLLATE NOCASE, c.wikibase_id
             LIMIT ?1"
        );
        return query_concepts(conn, &sql, params![limit]);
    }

    let pattern = format!("{}%", escape_like(query));
    let sql = format!(
        "SELECT {CONCEPT_COLUMNS} FROM concepts c
         WHERE c.preferred_label LIKE ?1 ESCAPE '\\'
         ORDER BY c.preferred_label COLLATE NOCASE, c.wikibase_id
         LIMIT ?2"
    );
    query_concepts(conn, &sql, params![pattern, limit])
}

pub fn count_concepts(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM concepts", [], |row| row.get(0))?;
    Ok(count as u64)
}

pub fn ping(conn: &Connection) -> Result<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}
