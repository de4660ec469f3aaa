use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::auth::bearer_claims;
use crate::errors::AppError;
use crate::models::{PendingReservation, Reservation, ReservationStatus};
use crate::state::AppState;

// GET /api/pending
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PendingReservation>>, AppError> {
    let claims = bearer_claims(&headers, &state.config.jwt_secret)?;
    let pending = state.store.list_pending(&claims.biz, 200).await?;
    Ok(Json(pending))
}

// POST /api/pending/:id/promote
//
// The reviewer supplies the corrected fields; the raw payload stays behind
// as an audit record.
#[derive(Deserialize)]
pub struct PromoteRequest {
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub date: String,
    pub time: String,
    pub guests: i64,
    pub special_requests: Option<String>,
}

pub async fn promote_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<PromoteRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let claims = bearer_claims(&headers, &state.config.jwt_secret)?;

    let pending = state
        .store
        .get_pending(&id)
        .await?
        .filter(|p| p.business_id.as_deref() == Some(claims.biz.as_str()))
        .ok_or_else(|| AppError::NotFound("pending reservation not found".to_string()))?;

    let guest_name = body.guest_name.trim();
    if guest_name.is_empty() {
        return Err(AppError::Validation("guest_name is required".to_string()));
    }
    let date = NaiveDate::parse_from_str(&body.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("date must be YYYY-MM-DD".to_string()))?;
    NaiveTime::parse_from_str(&body.time, "%H:%M")
        .map_err(|_| AppError::Validation("time must be 24-hour HH:MM".to_string()))?;
    if !(1..=50).contains(&body.guests) {
        return Err(AppError::Validation(
            "guests must be between 1 and 50".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    let reservation = Reservation {
        id: uuid::Uuid::new_v4().to_string(),
        business_id: claims.biz,
        guest_name: guest_name.to_string(),
        guest_phone: body.guest_phone.filter(|p| !p.trim().is_empty()),
        date,
        time: body.time,
        guests: body.guests,
        special_requests: body.special_requests.filter(|s| !s.trim().is_empty()),
        status: ReservationStatus::Confirmed,
        created_at: now,
        updated_at: now,
    };
    state.store.create_reservation(&reservation).await?;

    tracing::info!(
        pending_id = %pending.id,
        reservation_id = %reservation.id,
        "pending reservation promoted"
    );

    Ok((StatusCode::CREATED, Json(reservation)))
}
