use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub airtable_api_key: String,
    pub airtable_base_id: String,
    pub airtable_url: String,
    pub vapi_api_key: String,
    pub vapi_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "voicedesk.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "dev_secret_change_me".to_string()),
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            airtable_api_key: env::var("AIRTABLE_API_KEY").unwrap_or_default(),
            airtable_base_id: env::var("AIRTABLE_BASE_ID").unwrap_or_default(),
            airtable_url: env::var("AIRTABLE_URL")
                .unwrap_or_else(|_| "https://api.airtable.com/v0".to_string()),
            vapi_api_key: env::var("VAPI_API_KEY").unwrap_or_default(),
            vapi_url: env::var("VAPI_URL").unwrap_or_else(|_| "https://api.vapi.ai".to_string()),
        }
    }
}
