use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{normalize_phone, CallRecord, PendingReservation, Reservation, ReservationStatus};
use crate::services::normalizer::{self, Outcome};
use crate::services::{intent, prompts};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WebhookEnvelope {
    pub message: WebhookMessage,
}

#[derive(Deserialize)]
pub struct WebhookMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub call: Option<CallInfo>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<PhoneInfo>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(rename = "recordingUrl")]
    pub recording_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CallInfo {
    pub id: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<PhoneInfo>,
}

#[derive(Deserialize)]
pub struct PhoneInfo {
    pub number: Option<String>,
}

/// The dialed business line, wherever the vendor put it in this event.
fn dialed_number(message: &WebhookMessage) -> Option<String> {
    message
        .phone_number
        .as_ref()
        .and_then(|p| p.number.clone())
        .or_else(|| {
            message
                .call
                .as_ref()
                .and_then(|c| c.phone_number.as_ref())
                .and_then(|p| p.number.clone())
        })
}

// POST /webhook/call
pub async fn call_webhook(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<WebhookEnvelope>,
) -> Result<Json<serde_json::Value>, AppError> {
    let message = envelope.message;
    match message.kind.as_str() {
        "assistant-request" => assistant_request(&state, &message).await,
        "end-of-call-report" => end_of_call_report(&state, &message).await,
        other => {
            tracing::debug!(kind = other, "ignoring webhook event");
            Ok(Json(serde_json::json!({ "ok": true, "ignored": other })))
        }
    }
}

/// An inbound call is ringing; answer with the assistant configuration for
/// the dialed business.
async fn assistant_request(
    state: &AppState,
    message: &WebhookMessage,
) -> Result<Json<serde_json::Value>, AppError> {
    let number = dialed_number(message)
        .ok_or_else(|| AppError::Validation("missing dialed number".to_string()))?;

    let business = state
        .store
        .get_business_by_phone(&normalize_phone(&number))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no business registered for {number}")))?;

    let system_prompt = prompts::build_system_prompt(&business, Utc::now().naive_utc());

    Ok(Json(serde_json::json!({
        "assistant": {
            "firstMessage": business.greeting,
            "model": {
                "provider": "openai",
                "model": "gpt-4o-mini",
                "temperature": 0.5,
                "systemPrompt": system_prompt,
            },
        },
    })))
}

/// A call ended; extract a reservation from the transcript if there is one,
/// then log the call. Replayed reports are detected by call id and skipped.
async fn end_of_call_report(
    state: &AppState,
    message: &WebhookMessage,
) -> Result<Json<serde_json::Value>, AppError> {
    let call_id = message
        .call
        .as_ref()
        .and_then(|c| c.id.clone())
        .ok_or_else(|| AppError::Validation("missing call id".to_string()))?;

    let number = dialed_number(message)
        .ok_or_else(|| AppError::Validation("missing dialed number".to_string()))?;
    let business = state
        .store
        .get_business_by_phone(&normalize_phone(&number))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no business registered for {number}")))?;

    if state
        .store
        .get_call_record_by_call_id(&call_id)
        .await?
        .is_some()
    {
        tracing::info!(call_id = %call_id, "duplicate end-of-call report, skipping");
        return Ok(Json(serde_json::json!({ "ok": true, "duplicate": true })));
    }

    let transcript = message.transcript.as_deref().unwrap_or("");
    let today = Utc::now().date_naive();
    let (raw, outcome) = normalizer::process_transcript(transcript, today);

    let now = Utc::now().naive_utc();
    let (outcome_label, reservation_id) = match &outcome {
        Outcome::Ready(normalized) => {
            let reservation = Reservation {
                id: uuid::Uuid::new_v4().to_string(),
                business_id: business.id.clone(),
                guest_name: normalized.guest_name.clone(),
                guest_phone: normalized.guest_phone.clone(),
                date: normalized.date,
                time: normalized.time.clone(),
                guests: normalized.guests,
                special_requests: normalized.special_requests.clone(),
                status: ReservationStatus::Confirmed,
                created_at: now,
                updated_at: now,
            };
            state.store.create_reservation(&reservation).await?;
            tracing::info!(
                reservation_id = %reservation.id,
                business_id = %business.id,
                "reservation created from call"
            );
            ("reservation_created", Some(reservation.id))
        }
        Outcome::Staged { reason } => {
            let pending = PendingReservation {
                id: uuid::Uuid::new_v4().to_string(),
                business_id: Some(business.id.clone()),
                payload: serde_json::to_value(&raw).map_err(anyhow::Error::from)?,
                reason: reason.clone(),
                created_at: now,
            };
            state.store.create_pending(&pending).await?;
            tracing::info!(
                pending_id = %pending.id,
                reason = %reason,
                "reservation staged for review"
            );
            ("staged_for_review", Some(pending.id))
        }
        Outcome::NoReservation => ("no_reservation", None),
    };

    let record = CallRecord {
        id: uuid::Uuid::new_v4().to_string(),
        business_id: business.id.clone(),
        call_id,
        intent: intent::classify(transcript, &outcome),
        outcome: outcome_label.to_string(),
        summary: message.summary.clone().unwrap_or_default(),
        recording_url: message.recording_url.clone(),
        created_at: now,
    };
    state.store.append_call_record(&record).await?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "outcome": outcome_label,
        "id": reservation_id,
    })))
}
