use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub business_name: String,
    pub full_name: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: UserStatus,
    pub business_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Active,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            // hosted-store rows written before the rename use "done"
            "active" | "done" => UserStatus::Active,
            _ => UserStatus::Pending,
        }
    }
}
