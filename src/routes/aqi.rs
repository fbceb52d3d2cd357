//! Published AQI and session status endpoints.
//!
//! - `GET /aqi` – latest published NowCast AQI, `503` with `"N/A"` until the
//!   window holds enough data
//! - `GET /status` – full session snapshot: counters, elapsed time, accuracy,
//!   presentation buffers, and AQI history

use std::sync::Arc;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::breakpoints::Category;
use crate::session::{Session, SessionStatus};

// ---

pub fn router() -> Router<Arc<Session>> {
    // ---
    Router::new()
        .route("/aqi", get(current_aqi))
        .route("/status", get(status))
}

#[derive(Debug, Serialize)]
struct AqiResponse {
    session_id: Uuid,
    value: f64,
    category: Category,
    label: &'static str,
    color: Option<&'static str>,
    timestamp: DateTime<Utc>,
    display: String,
}

#[derive(Debug, Serialize)]
struct UnavailableResponse {
    session_id: Uuid,
    aqi: &'static str,
}

async fn current_aqi(State(session): State<Arc<Session>>) -> impl IntoResponse {
    // ---
    match session.published() {
        Some(published) => {
            let category = published.result.category;
            let body = AqiResponse {
                session_id: session.id(),
                value: published.result.value,
                category,
                label: category.label(),
                color: category.color_hex(),
                timestamp: published.timestamp,
                display: published.to_string(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        None => {
            debug!("GET /aqi - no AQI published yet");
            let body = UnavailableResponse {
                session_id: session.id(),
                aqi: "N/A",
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

async fn status(State(session): State<Arc<Session>>) -> Json<SessionStatus> {
    Json(session.status())
}
