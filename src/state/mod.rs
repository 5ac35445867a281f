mod catalog;
mod registry;
mod sequencer;
mod tally;
mod vote;

pub use sequencer::BinaryAdvance;

use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Shared application state.
///
/// The vote maps are keyed by their uniqueness constraint, so an upsert is a
/// plain insert and concurrent duplicates collapse to a single row. Lock
/// order when holding more than one store: rounds, then votes, then items.
#[derive(Clone)]
pub struct AppState {
    pub items: Arc<RwLock<Vec<Item>>>,
    pub ranked_rounds: Arc<RwLock<HashMap<RoundId, RankedRound>>>,
    pub submissions: Arc<RwLock<HashMap<(GroupId, ParticipantId), RankedSubmission>>>,
    pub binary_rounds: Arc<RwLock<HashMap<RoundId, BinaryRound>>>,
    pub binary_votes: Arc<RwLock<HashMap<(RoundId, ItemId, ParticipantId), BinaryVote>>>,
    /// Broadcast channel for ranked-topic subscribers
    pub ranked_events: broadcast::Sender<ServerMessage>,
    /// Broadcast channel for binary-topic subscribers
    pub binary_events: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_channel_capacity(capacity: usize) -> Self {
        let (ranked_tx, _rx) = broadcast::channel(capacity);
        let (binary_tx, _rx) = broadcast::channel(capacity);
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            ranked_rounds: Arc::new(RwLock::new(HashMap::new())),
            submissions: Arc::new(RwLock::new(HashMap::new())),
            binary_rounds: Arc::new(RwLock::new(HashMap::new())),
            binary_votes: Arc::new(RwLock::new(HashMap::new())),
            ranked_events: ranked_tx,
            binary_events: binary_tx,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
