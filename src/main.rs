use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use wappalyzer_lookup::models::ErrorResponse;
use wappalyzer_lookup::{LookupClient, LookupConfig, LookupError, LookupRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = LookupConfig::from_env()?;
    let client = Arc::new(LookupClient::new(&config)?);

    let app = Router::new()
        .route("/health", get(health))
        .route("/lookup", post(lookup_endpoint))
        .with_state(client);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn lookup_endpoint(
    State(client): State<Arc<LookupClient>>,
    Json(req): Json<LookupRequest>,
) -> Response {
    tracing::info!(urls = ?req.urls, callback = ?req.callback_url, "lookup requested");
    match client.lookup(&req).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            if let LookupError::Upstream { reason } = &e {
                tracing::warn!(%reason, "lookup failed upstream");
            }
            let status = error_status(&e);
            let body = ErrorResponse {
                error: e.to_string(),
            };
            (status, Json(body)).into_response()
        }
    }
}

fn error_status(e: &LookupError) -> StatusCode {
    match e {
        LookupError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        LookupError::Upstream { .. } => StatusCode::BAD_GATEWAY,
    }
}
