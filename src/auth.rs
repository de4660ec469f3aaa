use axum::http::HeaderMap;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

// ── Passwords ──

/// Hash a password as `salt$base64(HMAC-SHA256(salt, password))`.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, hash)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == hash
}

fn digest(salt: &str, password: &str) -> String {
    // new_from_slice only fails on zero-length keys for variable-key HMACs;
    // salts are always non-empty here
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes()).expect("hmac accepts any key length");
    mac.update(password.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

// ── Bearer tokens ──

/// Claims carried by a business-scoped token. Validation checks the
/// signature and expiry only; there is no revocation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Business id the token is scoped to.
    pub biz: String,
    /// Expiry, unix seconds.
    pub exp: i64,
}

pub fn issue_token(secret: &str, user_id: &str, business_id: &str, ttl_hours: i64) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        biz: business_id.to_string(),
        exp: (Utc::now() + chrono::Duration::hours(ttl_hours)).timestamp(),
    };
    sign_claims(secret, &claims)
}

fn sign_claims(secret: &str, claims: &Claims) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_string(claims).expect("claims serialize"));
    let signature = sign(secret, &format!("{header}.{payload}"));
    format!("{header}.{payload}.{signature}")
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    let mut parts = token.splitn(3, '.');
    let (Some(header), Some(payload), Some(signature)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::Unauthorized);
    };

    if sign(secret, &format!("{header}.{payload}")) != signature {
        return Err(AppError::Unauthorized);
    }

    let claims: Claims = URL_SAFE_NO_PAD
        .decode(payload)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or(AppError::Unauthorized)?;

    if claims.exp <= Utc::now().timestamp() {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}

fn sign(secret: &str, data: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(data.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Extract and verify the bearer token on a protected endpoint.
pub fn bearer_claims(headers: &HeaderMap, secret: &str) -> Result<Claims, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
    verify_token(secret, token)
}
