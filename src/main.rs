mod batch;
mod encoder;
mod error;
mod gemini;
mod models;
mod prompt;
mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use routes::{
    create_session, download_slot, generate, get_session, redo_slot, set_style, upload_image,
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::gemini::GeminiClient;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| "DEMO_KEY".into());
    tracing::info!("Using API key: {}...", &api_key[..std::cmp::min(10, api_key.len())]);
    let state = AppState {
        store: Arc::default(),
        generator: Arc::new(GeminiClient::new(api_key)),
    };

    let app = Router::new()
        .route("/api/session", post(create_session))
        .route("/api/session/:id", get(get_session))
        .route("/api/session/:id/style", post(set_style))
        .route("/api/session/:id/image/:role", post(upload_image))
        .route("/api/session/:id/generate", post(generate))
        .route("/api/session/:id/redo/:index", post(redo_slot))
        .route("/api/session/:id/download/:index", get(download_slot))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Starting server");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app).await.unwrap();
}
