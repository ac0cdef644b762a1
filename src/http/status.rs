use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::relay::Mode;

#[derive(Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub mode: Mode,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        mode: state.relay.mode(),
    })
}
