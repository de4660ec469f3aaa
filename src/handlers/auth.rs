use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::errors::AppError;
use crate::models::{User, UserStatus};
use crate::state::AppState;

// POST /auth/signup
#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub business_name: String,
    pub full_name: String,
    pub phone: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub id: String,
    pub email: String,
    pub status: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let email = body.email.trim().to_lowercase();
    if !email.contains('@') || !email.contains('.') {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if body.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    if body.business_name.trim().is_empty() {
        return Err(AppError::Validation("business_name is required".to_string()));
    }

    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("email already registered".to_string()));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        business_name: body.business_name.trim().to_string(),
        full_name: body.full_name.trim().to_string(),
        phone: body.phone.trim().to_string(),
        password_hash: auth::hash_password(&body.password),
        status: UserStatus::Pending,
        business_id: None,
        created_at: Utc::now().naive_utc(),
    };
    state.store.create_user(&user).await?;

    tracing::info!(user_id = %user.id, "new signup awaiting approval");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: user.id,
            email: user.email,
            status: user.status.as_str().to_string(),
        }),
    ))
}

// POST /auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub business_id: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = body.email.trim().to_lowercase();

    // Unknown email and bad password are indistinguishable to the caller.
    let user = state
        .store
        .get_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !auth::verify_password(&body.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    if user.status == UserStatus::Pending {
        return Err(AppError::Forbidden(
            "account is pending approval".to_string(),
        ));
    }
    let business_id = user.business_id.ok_or_else(|| {
        AppError::Forbidden("no business is linked to this account".to_string())
    })?;
    if state.store.get_business(&business_id).await?.is_none() {
        return Err(AppError::Forbidden(
            "linked business no longer exists".to_string(),
        ));
    }

    let token = auth::issue_token(
        &state.config.jwt_secret,
        &user.id,
        &business_id,
        state.config.token_ttl_hours,
    );

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        business_id,
    }))
}
