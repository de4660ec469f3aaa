use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use voicedesk::config::AppConfig;
use voicedesk::db;
use voicedesk::handlers;
use voicedesk::services::voice::vapi::VapiProvider;
use voicedesk::services::voice::VoiceProvider;
use voicedesk::state::AppState;
use voicedesk::store::airtable::AirtableStore;
use voicedesk::store::sqlite::SqliteStore;
use voicedesk::store::TableStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let store: Box<dyn TableStore> = if config.airtable_api_key.is_empty() {
        tracing::info!("using local sqlite store ({})", config.database_url);
        let conn = db::init_db(&config.database_url)?;
        Box::new(SqliteStore::new(conn))
    } else {
        anyhow::ensure!(
            !config.airtable_base_id.is_empty(),
            "AIRTABLE_BASE_ID must be set when AIRTABLE_API_KEY is set"
        );
        tracing::info!("using hosted tabular store (base: {})", config.airtable_base_id);
        Box::new(AirtableStore::new(
            config.airtable_api_key.clone(),
            config.airtable_url.clone(),
            config.airtable_base_id.clone(),
        ))
    };

    let voice: Box<dyn VoiceProvider> = Box::new(VapiProvider::new(
        config.vapi_api_key.clone(),
        config.vapi_url.clone(),
    ));

    let state = Arc::new(AppState {
        store,
        voice,
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/webhook/call", post(handlers::webhook::call_webhook))
        .route(
            "/api/reservations",
            get(handlers::reservations::list_reservations)
                .post(handlers::reservations::create_reservation),
        )
        .route(
            "/api/reservations/:id",
            get(handlers::reservations::get_reservation),
        )
        .route(
            "/api/reservations/:id/cancel",
            post(handlers::reservations::cancel_reservation),
        )
        .route("/api/pending", get(handlers::pending::list_pending))
        .route(
            "/api/pending/:id/promote",
            post(handlers::pending::promote_pending),
        )
        .route("/api/calls", get(handlers::calls::list_calls))
        .route("/api/dashboard/stats", get(handlers::dashboard::stats))
        .route(
            "/api/admin/users/:id/activate",
            post(handlers::admin::activate_user),
        )
        .route(
            "/api/admin/businesses",
            post(handlers::admin::create_business),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
