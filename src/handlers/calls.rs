use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::auth::bearer_claims;
use crate::errors::AppError;
use crate::models::CallRecord;
use crate::state::AppState;

// GET /api/calls
#[derive(Deserialize)]
pub struct CallsQuery {
    pub limit: Option<i64>,
}

pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CallsQuery>,
) -> Result<Json<Vec<CallRecord>>, AppError> {
    let claims = bearer_claims(&headers, &state.config.jwt_secret)?;
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let records = state.store.list_call_records(&claims.biz, limit).await?;
    Ok(Json(records))
}
