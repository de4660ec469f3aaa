use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A business/location that receives calls. The descriptive fields feed the
/// voice vendor's system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub owner_id: String,
    pub business_type: String,
    pub address: String,
    pub policies: String,
    pub greeting: String,
    pub description: String,
    pub created_at: NaiveDateTime,
}

/// Strip a phone number down to digits for matching, e.g.
/// "+1 (912) 737-0374" -> "19127370374".
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}
