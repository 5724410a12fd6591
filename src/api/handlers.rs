use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppState;
use crate::core::{Concept, ConceptDetail};
use crate::store;

pub const MAX_SEARCH_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello World",
    })
}

/// GET /health
///
/// Runs `SELECT 1` against a pooled connection.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let result = state.with_connection(store::ping).await;
    match result {
        Ok(()) => Ok(Json(HealthResponse { status: "healthy" })),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(ApiError::DatabaseUnavailable)
        }
    }
}

/// GET /concepts/:concept_id
///
/// The concept with its related concepts, subconcepts and parents.
pub async fn get_concept(
    State(state): State<AppState>,
    Path(concept_id): Path<String>,
) -> Result<Json<ConceptDetail>, ApiError> {
    let detail = state
        .with_connection(move |conn| store::get_concept_detail(conn, &concept_id))
        .await?;

    detail
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Concept not found".to_string()))
}

/// GET /search?q=&limit=
///
/// Case-insensitive prefix match on the preferred label.
pub async fn search_concepts(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Concept>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;

    if params.limit == 0 || params.limit > MAX_SEARCH_LIMIT {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_SEARCH_LIMIT
        )));
    }

    let concepts = state
        .with_connection(move |conn| store::search(conn, &params.q, params.limit))
        .await?;
    Ok(Json(concepts))
}
