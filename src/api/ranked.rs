//! Handlers for ranked tri-choice rounds.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ParticipantQuery;
use crate::error::{EngineError, EngineResult};
use crate::state::AppState;
use crate::types::*;

#[derive(Debug, Clone, Serialize)]
pub struct CreateRankedResponse {
    pub round: RankedRound,
    pub groups_created: usize,
}

/// Create a ranked round over the active catalog.
///
/// POST /api/ranked
pub async fn create_round(
    State(state): State<Arc<AppState>>,
) -> EngineResult<Json<CreateRankedResponse>> {
    let round = state.create_ranked_round().await?;
    let groups_created = round.groups.len();
    Ok(Json(CreateRankedResponse {
        round,
        groups_created,
    }))
}

/// POST /api/ranked/{round_id}/activate
pub async fn activate_round(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<RoundId>,
) -> EngineResult<Json<RankedRound>> {
    Ok(Json(state.activate_ranked_round(&round_id).await?))
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvanceRankedResponse {
    pub round: RankedRound,
    pub current_group_index: usize,
}

/// POST /api/ranked/{round_id}/advance
pub async fn advance_round(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<RoundId>,
) -> EngineResult<Json<AdvanceRankedResponse>> {
    let (round, current_group_index) = state.advance_ranked_round(&round_id).await?;
    Ok(Json(AdvanceRankedResponse {
        round,
        current_group_index,
    }))
}

/// POST /api/ranked/{round_id}/end
pub async fn end_round(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<RoundId>,
) -> EngineResult<Json<RankedRound>> {
    Ok(Json(state.end_ranked_round(&round_id).await?))
}

/// The current group with its items embedded, so clients can render it
/// without a second catalog query.
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub id: GroupId,
    pub group_number: usize,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentRankedResponse {
    pub round: RankedRound,
    pub current_group: Option<GroupView>,
    pub submission_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_submitted: Option<bool>,
}

/// The round clients should display right now.
///
/// GET /api/ranked/current?participant=…
pub async fn current_round(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParticipantQuery>,
) -> EngineResult<Json<CurrentRankedResponse>> {
    let round = state.current_ranked_round().await?;

    let mut current_group = None;
    let mut submission_count = 0;
    let mut has_submitted = None;
    if let Some(group) = round.current_group.and_then(|i| round.groups.get(i)) {
        submission_count = state.group_submission_count(&group.id).await;
        if let Some(participant) = &query.participant {
            has_submitted = Some(
                state
                    .participant_submission(&group.id, participant)
                    .await
                    .is_some(),
            );
        }
        current_group = Some(GroupView {
            id: group.id.clone(),
            group_number: group.group_number,
            items: state.items_for(&group.items).await,
        });
    }

    Ok(Json(CurrentRankedResponse {
        round,
        current_group,
        submission_count,
        has_submitted,
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankedVoteRequest {
    pub round_id: RoundId,
    pub group_id: GroupId,
    pub participant_id: ParticipantId,
    pub bucket_a: ItemId,
    pub bucket_b: ItemId,
    pub bucket_c: ItemId,
}

/// Submit (or replace) a bucket assignment; responds with the group's fresh
/// tally.
///
/// POST /api/ranked/vote
pub async fn submit_vote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RankedVoteRequest>,
) -> EngineResult<Json<GroupTally>> {
    let ballot = RankedBallot {
        bucket_a: req.bucket_a,
        bucket_b: req.bucket_b,
        bucket_c: req.bucket_c,
    };
    let tally = state
        .submit_ranked_vote(&req.round_id, &req.group_id, &req.participant_id, ballot)
        .await?;
    Ok(Json(tally))
}

/// GET /api/ranked/groups/{group_id}/tally
pub async fn group_tally(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<GroupId>,
) -> EngineResult<Json<GroupTally>> {
    let tally = state.group_tally(&group_id).await?;
    if tally.total_submissions == 0 {
        return Err(EngineError::NoSubmissions);
    }
    Ok(Json(tally))
}

/// GET /api/ranked/{round_id}/tally
pub async fn cumulative_tally(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<RoundId>,
) -> EngineResult<Json<CumulativeTally>> {
    let tally = state.cumulative_tally(&round_id).await?;
    if tally.total_submissions == 0 {
        return Err(EngineError::NoSubmissions);
    }
    Ok(Json(tally))
}
