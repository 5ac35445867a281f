use super::AppState;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{ServerMessage, Topic};
use crate::types::*;
use rand::seq::SliceRandom;

/// Groups are exactly this size; a trailing remainder is dropped at creation.
const GROUP_SIZE: usize = 3;

impl AppState {
    /// Create a ranked round in `setup` from a shuffled snapshot of the
    /// currently active catalog. At most one non-terminal ranked round may
    /// exist at a time.
    pub async fn create_ranked_round(&self) -> EngineResult<RankedRound> {
        let mut pool: Vec<ItemId> = self
            .active_items()
            .await
            .into_iter()
            .map(|i| i.id)
            .collect();
        if pool.len() < GROUP_SIZE {
            return Err(EngineError::InsufficientItems {
                required: GROUP_SIZE,
                available: pool.len(),
            });
        }

        let mut rounds = self.ranked_rounds.write().await;
        if rounds.values().any(|r| !r.status.is_terminal()) {
            return Err(EngineError::RoundInProgress("ranked"));
        }

        pool.shuffle(&mut rand::rng());
        let round_id = ulid::Ulid::new().to_string();
        let groups: Vec<Group> = pool
            .chunks_exact(GROUP_SIZE)
            .enumerate()
            .map(|(number, chunk)| Group {
                id: ulid::Ulid::new().to_string(),
                round_id: round_id.clone(),
                group_number: number,
                items: [chunk[0].clone(), chunk[1].clone(), chunk[2].clone()],
            })
            .collect();

        let round = RankedRound {
            id: round_id,
            status: RankedStatus::Setup,
            groups,
            current_group: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
            ended_at: None,
        };
        rounds.insert(round.id.clone(), round.clone());
        tracing::info!(
            round_id = %round.id,
            groups = round.groups.len(),
            dropped = pool.len() % GROUP_SIZE,
            "Ranked round created"
        );
        Ok(round)
    }

    /// `setup -> active`: point the cursor at the first group and go live.
    pub async fn activate_ranked_round(&self, round_id: &str) -> EngineResult<RankedRound> {
        let activated = {
            let mut rounds = self.ranked_rounds.write().await;
            let round = rounds
                .get_mut(round_id)
                .ok_or_else(|| EngineError::RoundNotFound(round_id.to_string()))?;
            if round.status != RankedStatus::Setup {
                return Err(EngineError::InvalidTransition {
                    round_id: round.id.clone(),
                    from: round.status.to_string(),
                    to: RankedStatus::Active.to_string(),
                });
            }
            round.status = RankedStatus::Active;
            round.current_group = Some(0);
            round.started_at = Some(chrono::Utc::now().to_rfc3339());
            round.clone()
        };

        tracing::info!(round_id = %activated.id, "Ranked round activated");
        self.publish(
            Topic::Ranked,
            ServerMessage::RoundActivated {
                round_id: activated.id.clone(),
            },
        );
        Ok(activated)
    }

    /// `active -> ended`. Ending is always explicit; running out of groups
    /// never ends a round on its own.
    pub async fn end_ranked_round(&self, round_id: &str) -> EngineResult<RankedRound> {
        let ended = {
            let mut rounds = self.ranked_rounds.write().await;
            let round = rounds
                .get_mut(round_id)
                .ok_or_else(|| EngineError::RoundNotFound(round_id.to_string()))?;
            if round.status != RankedStatus::Active {
                return Err(EngineError::RoundNotActive(round.id.clone()));
            }
            round.status = RankedStatus::Ended;
            round.current_group = None;
            round.ended_at = Some(chrono::Utc::now().to_rfc3339());
            round.clone()
        };

        tracing::info!(round_id = %ended.id, "Ranked round ended");
        self.publish(
            Topic::Ranked,
            ServerMessage::RoundEnded {
                round_id: ended.id.clone(),
            },
        );
        Ok(ended)
    }

    /// Create a binary round over a shuffled snapshot of the whole catalog,
    /// inactive items included, and put it live immediately.
    pub async fn create_binary_round(&self) -> EngineResult<BinaryRound> {
        let mut order: Vec<ItemId> = self.all_items().await.into_iter().map(|i| i.id).collect();
        if order.is_empty() {
            return Err(EngineError::NoItems);
        }

        let created = {
            let mut rounds = self.binary_rounds.write().await;
            if rounds.values().any(|r| !r.status.is_terminal()) {
                return Err(EngineError::RoundInProgress("binary"));
            }

            order.shuffle(&mut rand::rng());
            let now = chrono::Utc::now().to_rfc3339();
            let round = BinaryRound {
                id: ulid::Ulid::new().to_string(),
                status: BinaryStatus::Active,
                order,
                current_index: 0,
                created_at: now.clone(),
                started_at: Some(now),
                ended_at: None,
            };
            rounds.insert(round.id.clone(), round.clone());
            round
        };

        tracing::info!(
            round_id = %created.id,
            items = created.order.len(),
            "Binary round created and activated"
        );
        self.publish(
            Topic::Binary,
            ServerMessage::RoundActivated {
                round_id: created.id.clone(),
            },
        );
        Ok(created)
    }

    /// The round clients should be looking at: the live round if one exists,
    /// otherwise the most recently created one (so results of a finished
    /// round stay reachable).
    pub async fn current_ranked_round(&self) -> EngineResult<RankedRound> {
        let rounds = self.ranked_rounds.read().await;
        if let Some(live) = rounds
            .values()
            .filter(|r| !r.status.is_terminal())
            .max_by_key(|r| (r.created_at.clone(), r.id.clone()))
        {
            return Ok(live.clone());
        }
        rounds
            .values()
            .max_by_key(|r| (r.created_at.clone(), r.id.clone()))
            .cloned()
            .ok_or(EngineError::NoRound)
    }

    pub async fn current_binary_round(&self) -> EngineResult<BinaryRound> {
        let rounds = self.binary_rounds.read().await;
        if let Some(live) = rounds
            .values()
            .filter(|r| !r.status.is_terminal())
            .max_by_key(|r| (r.created_at.clone(), r.id.clone()))
        {
            return Ok(live.clone());
        }
        rounds
            .values()
            .max_by_key(|r| (r.created_at.clone(), r.id.clone()))
            .cloned()
            .ok_or(EngineError::NoRound)
    }

    pub async fn ranked_round(&self, round_id: &str) -> EngineResult<RankedRound> {
        self.ranked_rounds
            .read()
            .await
            .get(round_id)
            .cloned()
            .ok_or_else(|| EngineError::RoundNotFound(round_id.to_string()))
    }

    pub async fn binary_round(&self, round_id: &str) -> EngineResult<BinaryRound> {
        self.binary_rounds
            .read()
            .await
            .get(round_id)
            .cloned()
            .ok_or_else(|| EngineError::RoundNotFound(round_id.to_string()))
    }

    /// Locate a group across all ranked rounds. Group ids are ulids, so
    /// they are unique globally, not just within their round.
    pub async fn find_group(&self, group_id: &str) -> EngineResult<(RankedRound, Group)> {
        let rounds = self.ranked_rounds.read().await;
        for round in rounds.values() {
            if let Some(group) = round.group(group_id) {
                return Ok((round.clone(), group.clone()));
            }
        }
        Err(EngineError::GroupNotFound(group_id.to_string()))
    }
}
