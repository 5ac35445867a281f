use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::types::{GroupId, ItemId, RoundId};

/// Everything that can go wrong inside the engine. Variants group into
/// validation (bad vote payloads), state (legal payload, wrong moment),
/// resource (catalog too small) and lookup failures; the HTTP mapping
/// follows that grouping.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    // Validation
    #[error("the three bucket assignments must reference distinct items")]
    DuplicateAssignment,
    #[error("item {0} is not part of this group")]
    ItemNotInGroup(ItemId),
    #[error("item {0} is not part of this round")]
    ItemNotInRound(ItemId),

    // State
    #[error("round {round_id} cannot go from {from} to {to}")]
    InvalidTransition {
        round_id: RoundId,
        from: String,
        to: String,
    },
    #[error("round {0} is not active")]
    RoundNotActive(RoundId),
    #[error("round {0} has no more groups")]
    Exhausted(RoundId),
    #[error("item {0} is not the item currently on stage")]
    ItemNotCurrent(ItemId),
    #[error("round {0} is already completed")]
    RoundCompleted(RoundId),
    #[error("a {0} round is already in progress")]
    RoundInProgress(&'static str),

    // Resource
    #[error("need at least {required} active items, have {available}")]
    InsufficientItems { required: usize, available: usize },
    #[error("the catalog has no items")]
    NoItems,

    // Lookup
    #[error("round {0} not found")]
    RoundNotFound(RoundId),
    #[error("group {0} not found")]
    GroupNotFound(GroupId),
    #[error("no round available")]
    NoRound,
    #[error("no submissions yet")]
    NoSubmissions,
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Stable machine-readable code carried in error bodies and WS frames.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::DuplicateAssignment => "DUPLICATE_ASSIGNMENT",
            EngineError::ItemNotInGroup(_) => "ITEM_NOT_IN_GROUP",
            EngineError::ItemNotInRound(_) => "ITEM_NOT_IN_ROUND",
            EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EngineError::RoundNotActive(_) => "ROUND_NOT_ACTIVE",
            EngineError::Exhausted(_) => "ROUND_EXHAUSTED",
            EngineError::ItemNotCurrent(_) => "ITEM_NOT_CURRENT",
            EngineError::RoundCompleted(_) => "ROUND_COMPLETED",
            EngineError::RoundInProgress(_) => "ROUND_IN_PROGRESS",
            EngineError::InsufficientItems { .. } => "INSUFFICIENT_ITEMS",
            EngineError::NoItems => "NO_ITEMS",
            EngineError::RoundNotFound(_) => "ROUND_NOT_FOUND",
            EngineError::GroupNotFound(_) => "GROUP_NOT_FOUND",
            EngineError::NoRound => "NO_ROUND",
            EngineError::NoSubmissions => "NO_SUBMISSIONS",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EngineError::DuplicateAssignment
            | EngineError::ItemNotInGroup(_)
            | EngineError::ItemNotInRound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::InvalidTransition { .. }
            | EngineError::RoundNotActive(_)
            | EngineError::Exhausted(_)
            | EngineError::ItemNotCurrent(_)
            | EngineError::RoundCompleted(_)
            | EngineError::RoundInProgress(_) => StatusCode::CONFLICT,
            EngineError::InsufficientItems { .. } | EngineError::NoItems => {
                StatusCode::BAD_REQUEST
            }
            EngineError::RoundNotFound(_)
            | EngineError::GroupNotFound(_)
            | EngineError::NoRound
            | EngineError::NoSubmissions => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
