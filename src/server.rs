//! HTTP API over the [`Recommender`].
//!
//! - `GET /`, `GET /health` → liveness
//! - `POST /recommend` → `{query, top_k?}` in, `{query, recommendations}` out

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::config::ShortlistConfig;
use crate::error::RecommendError;
use crate::service::Recommender;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn build_router(recommender: Arc<Recommender>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/recommend", post(recommend))
        .with_state(recommender)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        message: "Service is running".into(),
    })
}

async fn recommend(
    State(recommender): State<Arc<Recommender>>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::info!(error = %rejection.body_text(), "rejected malformed recommend body");
            let body = ErrorResponse {
                error: rejection.body_text(),
                kind: "invalid_argument".into(),
            };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };
    let top_k = request.top_k.unwrap_or(recommender.default_top_k());
    match recommender.recommend(&request.query, top_k).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            if e.is_client_error() {
                tracing::info!(error = %e, "rejected recommend request");
            } else {
                tracing::error!(error = %e, "recommend request failed");
            }
            e.into_response()
        }
    }
}

/// Serve the HTTP API until Ctrl-C.
pub async fn serve(config: ShortlistConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting recommender API");

    let recommender = Arc::new(Recommender::from_config(&config)?);
    let router = build_router(recommender);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c, running until killed");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
