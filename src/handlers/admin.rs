use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{normalize_phone, Business};
use crate::services::{lifecycle, prompts};
use crate::state::AppState;

/// Administrative endpoints use the static operator token, not a business
/// bearer token.
fn check_admin(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// POST /api/admin/users/:id/activate
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_admin(&headers, &state.config.admin_token)?;

    let user = state
        .store
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    let next = lifecycle::activate_user(user.status)
        .map_err(|e| AppError::Conflict(e.to_string()))?;

    let updated = state.store.set_user_status(&id, next).await?;
    if !updated {
        return Err(AppError::NotFound("user not found".to_string()));
    }

    tracing::info!(user_id = %id, "user activated");
    Ok(Json(serde_json::json!({ "ok": true, "status": next.as_str() })))
}

// POST /api/admin/businesses
#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub phone: String,
    pub owner_id: String,
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub policies: String,
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub description: String,
}

pub async fn create_business(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<Business>), AppError> {
    check_admin(&headers, &state.config.admin_token)?;

    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    let phone = normalize_phone(&body.phone);
    if phone.len() < 7 {
        return Err(AppError::Validation(
            "phone must contain at least 7 digits".to_string(),
        ));
    }

    let owner = state
        .store
        .get_user(&body.owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("owner not found".to_string()))?;

    if state.store.get_business_by_phone(&phone).await?.is_some() {
        return Err(AppError::Conflict(
            "a business is already registered on that number".to_string(),
        ));
    }

    let business = Business {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        phone,
        owner_id: owner.id.clone(),
        business_type: body.business_type,
        address: body.address,
        policies: body.policies,
        greeting: body.greeting,
        description: body.description,
        created_at: Utc::now().naive_utc(),
    };
    state.store.create_business(&business).await?;
    state.store.link_business(&owner.id, &business.id).await?;

    // Vendor registration is best effort; the operator can re-register later.
    let system_prompt = prompts::build_system_prompt(&business, Utc::now().naive_utc());
    if let Err(e) = state
        .voice
        .register_prompt(&business.phone, &system_prompt)
        .await
    {
        tracing::warn!(business_id = %business.id, error = %e, "voice vendor registration failed");
    }

    tracing::info!(business_id = %business.id, owner_id = %owner.id, "business created");
    Ok((StatusCode::CREATED, Json(business)))
}
