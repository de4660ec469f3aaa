use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::auth::bearer_claims;
use crate::errors::AppError;
use crate::models::{Reservation, ReservationStatus};
use crate::services::lifecycle;
use crate::state::AppState;

fn parse_status(s: &str) -> Result<ReservationStatus, AppError> {
    match s {
        "confirmed" => Ok(ReservationStatus::Confirmed),
        "cancelled" => Ok(ReservationStatus::Cancelled),
        "pending_review" => Ok(ReservationStatus::PendingReview),
        other => Err(AppError::Validation(format!(
            "unknown reservation status '{other}'"
        ))),
    }
}

// GET /api/reservations
#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let claims = bearer_claims(&headers, &state.config.jwt_secret)?;

    let status = query.status.as_deref().map(parse_status).transpose()?;
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let reservations = state
        .store
        .list_reservations(&claims.biz, status, limit)
        .await?;
    Ok(Json(reservations))
}

// POST /api/reservations
#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub date: String,
    pub time: String,
    pub guests: i64,
    pub special_requests: Option<String>,
}

pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let claims = bearer_claims(&headers, &state.config.jwt_secret)?;

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

    Ok((StatusCode::CREATED, Json(reservation)))
}

// GET /api/reservations/:id
pub async fn get_reservation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Reservation>, AppError> {
    let claims = bearer_claims(&headers, &state.config.jwt_secret)?;

    let reservation = state
        .store
        .get_reservation(&id)
        .await?
        .filter(|r| r.business_id == claims.biz)
        .ok_or_else(|| AppError::NotFound("reservation not found".to_string()))?;
    Ok(Json(reservation))
}

// POST /api/reservations/:id/cancel
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = bearer_claims(&headers, &state.config.jwt_secret)?;

    let reservation = state
        .store
        .get_reservation(&id)
        .await?
        .filter(|r| r.business_id == claims.biz)
        .ok_or_else(|| AppError::NotFound("reservation not found".to_string()))?;

    let next = lifecycle::cancel_reservation(reservation.status)
        .map_err(|e| AppError::Conflict(e.to_string()))?;

    let updated = state.store.update_reservation_status(&id, next).await?;
    if !updated {
        return Err(AppError::NotFound("reservation not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "ok": true, "status": next.as_str() })))
}
