//! HTTP gateway for display collaborators.
//!
//! Displays and plotters pull the published AQI and presentation buffers on
//! their own refresh cadence; nothing in the monitoring core pushes to them.
//! Each sibling module exports a subrouter that is merged here, so `main.rs`
//! only needs this one call (EMBP).

use std::sync::Arc;

use axum::Router;

use crate::session::Session;

mod aqi;
mod health;

// ---

pub fn router(session: Arc<Session>) -> Router {
    // ---
    Router::new()
        .merge(aqi::router())
        .merge(health::router())
        .with_state(session)
}
