use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One entry in the append-only call log. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub business_id: String,
    /// Correlation id assigned by the voice vendor; links a call event across
    /// normalization and logging, and keys idempotent webhook replays.
    pub call_id: String,
    pub intent: CallIntent,
    pub outcome: String,
    pub summary: String,
    pub recording_url: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallIntent {
    NewReservation,
    Cancellation,
    Modification,
    MenuInquiry,
    HoursInquiry,
    GeneralInquiry,
}

impl CallIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallIntent::NewReservation => "new_reservation",
            CallIntent::Cancellation => "cancellation",
            CallIntent::Modification => "modification",
            CallIntent::MenuInquiry => "menu_inquiry",
            CallIntent::HoursInquiry => "hours_inquiry",
            CallIntent::GeneralInquiry => "general_inquiry",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "new_reservation" => CallIntent::NewReservation,
            "cancellation" => CallIntent::Cancellation,
            "modification" => CallIntent::Modification,
            "menu_inquiry" => CallIntent::MenuInquiry,
            "hours_inquiry" => CallIntent::HoursInquiry,
            _ => CallIntent::GeneralInquiry,
        }
    }
}
