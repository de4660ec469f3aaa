use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Timelike;
use serde::Serialize;

use crate::auth::bearer_claims;
use crate::errors::AppError;
use crate::state::AppState;

// GET /api/dashboard/stats
#[derive(Serialize)]
pub struct StatsResponse {
    pub total_calls: i64,
    pub reservations_created: i64,
    pub staged_for_review: i64,
    pub missed_calls: i64,
    /// Call counts indexed by hour of day, 0..24.
    pub calls_by_hour: Vec<i64>,
    pub intent_breakdown: BTreeMap<String, i64>,
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    let claims = bearer_claims(&headers, &state.config.jwt_secret)?;

    let records = state.store.list_call_records(&claims.biz, 1000).await?;

    let mut reservations_created = 0;
    let mut staged_for_review = 0;
    let mut missed_calls = 0;
    let mut calls_by_hour = vec![0i64; 24];
    let mut intent_breakdown: BTreeMap<String, i64> = BTreeMap::new();

    for record in &records {
        match record.outcome.as_str() {
            "reservation_created" => reservations_created += 1,
            "staged_for_review" => staged_for_review += 1,
            "no_reservation" => missed_calls += 1,
            _ => {}
        }
        calls_by_hour[record.created_at.hour() as usize] += 1;
        *intent_breakdown
            .entry(record.intent.as_str().to_string())
            .or_insert(0) += 1;
    }

    Ok(Json(StatsResponse {
        total_calls: records.len() as i64,
        reservations_created,
        staged_for_review,
        missed_calls,
        calls_by_hour,
        intent_breakdown,
    }))
}
