//! Handlers for binary accept/reject rounds.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ParticipantQuery;
use crate::error::{EngineError, EngineResult};
use crate::state::{AppState, BinaryAdvance};
use crate::types::*;

#[derive(Debug, Clone, Serialize)]
pub struct CreateBinaryResponse {
    pub round: BinaryRound,
    pub total_items: usize,
}

/// Create a binary round over the whole catalog; it goes live immediately.
///
/// POST /api/binary
pub async fn create_round(
    State(state): State<Arc<AppState>>,
) -> EngineResult<Json<CreateBinaryResponse>> {
    let round = state.create_binary_round().await?;
    let total_items = round.order.len();
    Ok(Json(CreateBinaryResponse { round, total_items }))
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvanceBinaryResponse {
    pub round: BinaryRound,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item: Option<Item>,
}

/// Retire the current item (writing its verdict to the catalog) and move to
/// the next one, or complete the round after the last item.
///
/// POST /api/binary/{round_id}/advance
pub async fn advance_round(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<RoundId>,
) -> EngineResult<Json<AdvanceBinaryResponse>> {
    let (round, advance) = state.advance_binary_round(&round_id).await?;
    let response = match advance {
        BinaryAdvance::Next { item_id, .. } => AdvanceBinaryResponse {
            completed: false,
            current_item: state.item(&item_id).await,
            round,
        },
        BinaryAdvance::Completed => AdvanceBinaryResponse {
            completed: true,
            current_item: None,
            round,
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentBinaryResponse {
    pub round_id: RoundId,
    pub index: usize,
    pub item: Item,
    pub tally: ItemTally,
    pub total_items: usize,
    pub items_remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<BinaryChoice>,
}

async fn assemble_current(
    state: &AppState,
    round: BinaryRound,
    participant: Option<&str>,
) -> EngineResult<CurrentBinaryResponse> {
    match round.status {
        BinaryStatus::Active => {}
        BinaryStatus::Completed => return Err(EngineError::RoundCompleted(round.id.clone())),
        BinaryStatus::Setup => return Err(EngineError::RoundNotActive(round.id.clone())),
    }
    let Some(item_id) = round.current_item().cloned() else {
        return Err(EngineError::RoundCompleted(round.id.clone()));
    };
    let item = state
        .item(&item_id)
        .await
        .ok_or_else(|| EngineError::ItemNotInRound(item_id.clone()))?;
    let tally = state.item_tally(&round.id, &item_id).await;

    let (has_voted, choice) = match participant {
        Some(p) => {
            let vote = state.participant_binary_vote(&round.id, &item_id, p).await;
            (Some(vote.is_some()), vote.map(|v| v.choice))
        }
        None => (None, None),
    };

    Ok(CurrentBinaryResponse {
        round_id: round.id.clone(),
        index: round.current_index,
        item,
        tally,
        total_items: round.order.len(),
        items_remaining: round.items_remaining(),
        has_voted,
        choice,
    })
}

/// The item currently on stage in a specific round.
///
/// GET /api/binary/{round_id}/current?participant=…
pub async fn current_item(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<RoundId>,
    Query(query): Query<ParticipantQuery>,
) -> EngineResult<Json<CurrentBinaryResponse>> {
    let round = state.binary_round(&round_id).await?;
    Ok(Json(
        assemble_current(&state, round, query.participant.as_deref()).await?,
    ))
}

/// Same view, with the round resolved through the registry.
///
/// GET /api/binary/current?participant=…
pub async fn current_round(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParticipantQuery>,
) -> EngineResult<Json<CurrentBinaryResponse>> {
    let round = state.current_binary_round().await?;
    Ok(Json(
        assemble_current(&state, round, query.participant.as_deref()).await?,
    ))
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinaryVoteRequest {
    pub round_id: RoundId,
    pub item_id: ItemId,
    pub participant_id: ParticipantId,
    pub choice: BinaryChoice,
}

/// Submit (or replace) a verdict on the current item; responds with the
/// item's fresh tally.
///
/// POST /api/binary/vote
pub async fn submit_vote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BinaryVoteRequest>,
) -> EngineResult<Json<ItemTally>> {
    let tally = state
        .submit_binary_vote(&req.round_id, &req.item_id, &req.participant_id, req.choice)
        .await?;
    Ok(Json(tally))
}

/// Majority partition of a round's items.
///
/// GET /api/binary/{round_id}/results
pub async fn results(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<RoundId>,
) -> EngineResult<Json<BinaryResults>> {
    Ok(Json(state.binary_results(&round_id).await?))
}
