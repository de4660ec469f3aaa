use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub business_id: String,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub date: NaiveDate,
    /// 24-hour "HH:MM", as produced by the normalizer.
    pub time: String,
    pub guests: i64,
    pub special_requests: Option<String>,
    pub status: ReservationStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
    PendingReview,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::PendingReview => "pending_review",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "cancelled" => ReservationStatus::Cancelled,
            "pending_review" => ReservationStatus::PendingReview,
            _ => ReservationStatus::Confirmed,
        }
    }
}

/// A reservation whose fields could not be confidently normalized. Kept as an
/// audit record even after promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReservation {
    pub id: String,
    pub business_id: Option<String>,
    /// Raw extracted fields, exactly as they came out of the transcript.
    pub payload: serde_json::Value,
    pub reason: String,
    pub created_at: NaiveDateTime,
}
