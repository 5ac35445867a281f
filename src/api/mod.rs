//! HTTP surface of the engine.
//!
//! Operator actions and participant votes both travel over these routes;
//! the WebSocket endpoint in `crate::ws` only pushes events out.

pub mod binary;
pub mod ranked;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;
use crate::types::ParticipantId;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/participant", post(issue_participant))
        .route("/api/ranked", post(ranked::create_round))
        .route("/api/ranked/current", get(ranked::current_round))
        .route("/api/ranked/vote", post(ranked::submit_vote))
        .route(
            "/api/ranked/groups/{group_id}/tally",
            get(ranked::group_tally),
        )
        .route("/api/ranked/{round_id}/activate", post(ranked::activate_round))
        .route("/api/ranked/{round_id}/advance", post(ranked::advance_round))
        .route("/api/ranked/{round_id}/end", post(ranked::end_round))
        .route("/api/ranked/{round_id}/tally", get(ranked::cumulative_tally))
        .route("/api/binary", post(binary::create_round))
        .route("/api/binary/current", get(binary::current_round))
        .route("/api/binary/vote", post(binary::submit_vote))
        .route("/api/binary/{round_id}/current", get(binary::current_item))
        .route("/api/binary/{round_id}/advance", post(binary::advance_round))
        .route("/api/binary/{round_id}/results", get(binary::results))
}

/// Optional participant token on "current" reads; when present the response
/// carries that participant's own submission state for reconnect recovery.
#[derive(Debug, Deserialize)]
pub struct ParticipantQuery {
    pub participant: Option<ParticipantId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantResponse {
    pub participant_id: ParticipantId,
}

/// Mint an opaque participant token. Issued once per device; the engine
/// never does more with it than compare for equality.
///
/// POST /api/participant
pub async fn issue_participant() -> Json<ParticipantResponse> {
    let participant_id = ulid::Ulid::new().to_string();
    tracing::debug!(%participant_id, "Participant token issued");
    Json(ParticipantResponse { participant_id })
}
