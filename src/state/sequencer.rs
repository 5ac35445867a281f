use super::tally::decide_outcome;
use super::AppState;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{ServerMessage, Topic};
use crate::types::*;

/// What advancing a binary round produced.
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryAdvance {
    Next { index: usize, item_id: ItemId },
    Completed,
}

impl AppState {
    /// Move the ranked cursor to the next group. Strictly sequential; the
    /// cursor never skips and never moves backwards. Running out of groups
    /// is an error, not an end: the final group stays votable until the
    /// operator ends the round explicitly.
    pub async fn advance_ranked_round(&self, round_id: &str) -> EngineResult<(RankedRound, usize)> {
        let (round, new_index) = {
            let mut rounds = self.ranked_rounds.write().await;
            let round = rounds
                .get_mut(round_id)
                .ok_or_else(|| EngineError::RoundNotFound(round_id.to_string()))?;
            if round.status != RankedStatus::Active {
                return Err(EngineError::RoundNotActive(round.id.clone()));
            }
            let Some(current) = round.current_group else {
                return Err(EngineError::RoundNotActive(round.id.clone()));
            };
            if current + 1 >= round.groups.len() {
                return Err(EngineError::Exhausted(round.id.clone()));
            }
            let new_index = current + 1;
            round.current_group = Some(new_index);
            (round.clone(), new_index)
        };

        tracing::info!(round_id = %round.id, index = new_index, "Ranked round advanced");
        self.publish(
            Topic::Ranked,
            ServerMessage::RoundAdvanced {
                round_id: round.id.clone(),
                index: new_index,
            },
        );
        Ok((round, new_index))
    }

    /// Retire the current binary item and move on. The retiring item's
    /// majority verdict is written to its catalog flag first; then the
    /// cursor moves, or the round completes if this was the last item.
    ///
    /// The whole resolve-then-advance step runs under the round store's
    /// write guard: vote submission takes the read guard, so no vote can
    /// land between the final tally and the cursor move, and a retired
    /// item's outcome is frozen the moment it leaves the stage.
    pub async fn advance_binary_round(
        &self,
        round_id: &str,
    ) -> EngineResult<(BinaryRound, BinaryAdvance)> {
        let mut rounds = self.binary_rounds.write().await;
        let round = rounds
            .get_mut(round_id)
            .ok_or_else(|| EngineError::RoundNotFound(round_id.to_string()))?;
        match round.status {
            BinaryStatus::Active => {}
            BinaryStatus::Completed => {
                return Err(EngineError::RoundCompleted(round.id.clone()))
            }
            BinaryStatus::Setup => return Err(EngineError::RoundNotActive(round.id.clone())),
        }
        let Some(current_id) = round.current_item().cloned() else {
            return Err(EngineError::RoundCompleted(round.id.clone()));
        };

        let (accept, reject) = self.count_choices(&round.id, &current_id).await;
        match decide_outcome(accept, reject) {
            Some(active) => {
                self.set_active(&current_id, active).await;
                tracing::info!(
                    round_id = %round.id,
                    item_id = %current_id,
                    accept,
                    reject,
                    active,
                    "Binary item resolved"
                );
            }
            None => {
                tracing::info!(
                    round_id = %round.id,
                    item_id = %current_id,
                    accept,
                    reject,
                    "Binary item tied, flag unchanged"
                );
            }
        }

        let advance = if round.current_index + 1 < round.order.len() {
            round.current_index += 1;
            BinaryAdvance::Next {
                index: round.current_index,
                item_id: round.order[round.current_index].clone(),
            }
        } else {
            round.status = BinaryStatus::Completed;
            round.ended_at = Some(chrono::Utc::now().to_rfc3339());
            BinaryAdvance::Completed
        };
        let snapshot = round.clone();
        drop(rounds);

        match &advance {
            BinaryAdvance::Next { index, .. } => {
                self.publish(
                    Topic::Binary,
                    ServerMessage::RoundAdvanced {
                        round_id: snapshot.id.clone(),
                        index: *index,
                    },
                );
            }
            BinaryAdvance::Completed => {
                tracing::info!(round_id = %snapshot.id, "Binary round completed");
                self.publish(
                    Topic::Binary,
                    ServerMessage::BinaryCompleted {
                        round_id: snapshot.id.clone(),
                    },
                );
            }
        }
        Ok((snapshot, advance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(state: &AppState, count: usize, active: bool) {
        for i in 0..count {
            state.add_item(format!("Item {i}"), active).await;
        }
    }

    #[tokio::test]
    async fn test_ranked_advance_walks_groups_in_order() {
        let state = AppState::new();
        seed(&state, 7, true).await;
        let round = state.create_ranked_round().await.unwrap();
        state.activate_ranked_round(&round.id).await.unwrap();

        let (updated, index) = state.advance_ranked_round(&round.id).await.unwrap();
        assert_eq!(index, 1);
        assert_eq!(updated.current_group, Some(1));
    }

    #[tokio::test]
    async fn test_ranked_exhaustion_keeps_round_active() {
        let state = AppState::new();
        seed(&state, 7, true).await;
        let round = state.create_ranked_round().await.unwrap();
        state.activate_ranked_round(&round.id).await.unwrap();
        state.advance_ranked_round(&round.id).await.unwrap();

        // two groups, cursor on the last one
        let result = state.advance_ranked_round(&round.id).await;
        assert_eq!(result.unwrap_err(), EngineError::Exhausted(round.id.clone()));

        let still = state.ranked_round(&round.id).await.unwrap();
        assert_eq!(still.status, RankedStatus::Active);
        assert_eq!(still.current_group, Some(1));
    }

    #[tokio::test]
    async fn test_ranked_advance_requires_active_round() {
        let state = AppState::new();
        seed(&state, 3, true).await;
        let round = state.create_ranked_round().await.unwrap();

        assert!(matches!(
            state.advance_ranked_round(&round.id).await.unwrap_err(),
            EngineError::RoundNotActive(_)
        ));
        assert!(matches!(
            state.advance_ranked_round("missing").await.unwrap_err(),
            EngineError::RoundNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_binary_advance_applies_reject_majority() {
        let state = AppState::new();
        seed(&state, 3, true).await;
        let round = state.create_binary_round().await.unwrap();
        let current = round.order[0].clone();

        for p in ["p1", "p2"] {
            state
                .submit_binary_vote(&round.id, &current, p, BinaryChoice::Reject)
                .await
                .unwrap();
        }
        state
            .submit_binary_vote(&round.id, &current, "p3", BinaryChoice::Accept)
            .await
            .unwrap();

        let (updated, advance) = state.advance_binary_round(&round.id).await.unwrap();
        assert!(!state.item(&current).await.unwrap().active);
        assert_eq!(updated.current_index, 1);
        assert_eq!(
            advance,
            BinaryAdvance::Next {
                index: 1,
                item_id: round.order[1].clone()
            }
        );
    }

    #[tokio::test]
    async fn test_binary_advance_applies_accept_majority() {
        let state = AppState::new();
        // start everything inactive so an accept visibly flips the flag
        seed(&state, 3, false).await;
        let round = state.create_binary_round().await.unwrap();
        let current = round.order[0].clone();

        for p in ["p1", "p2"] {
            state
                .submit_binary_vote(&round.id, &current, p, BinaryChoice::Accept)
                .await
                .unwrap();
        }
        state
            .submit_binary_vote(&round.id, &current, "p3", BinaryChoice::Reject)
            .await
            .unwrap();

        state.advance_binary_round(&round.id).await.unwrap();
        assert!(state.item(&current).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_binary_tie_leaves_flag_unchanged() {
        let state = AppState::new();
        seed(&state, 3, true).await;
        let round = state.create_binary_round().await.unwrap();
        let current = round.order[0].clone();

        state
            .submit_binary_vote(&round.id, &current, "p1", BinaryChoice::Accept)
            .await
            .unwrap();
        state
            .submit_binary_vote(&round.id, &current, "p2", BinaryChoice::Reject)
            .await
            .unwrap();

        state.advance_binary_round(&round.id).await.unwrap();
        assert!(state.item(&current).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_binary_no_votes_is_a_tie() {
        let state = AppState::new();
        seed(&state, 3, true).await;
        let round = state.create_binary_round().await.unwrap();
        let current = round.order[0].clone();

        state.advance_binary_round(&round.id).await.unwrap();
        assert!(state.item(&current).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_binary_advance_completes_after_last_item() {
        let state = AppState::new();
        seed(&state, 3, true).await;
        let round = state.create_binary_round().await.unwrap();

        let (_, first) = state.advance_binary_round(&round.id).await.unwrap();
        let (_, second) = state.advance_binary_round(&round.id).await.unwrap();
        assert!(matches!(first, BinaryAdvance::Next { index: 1, .. }));
        assert!(matches!(second, BinaryAdvance::Next { index: 2, .. }));

        let (completed, last) = state.advance_binary_round(&round.id).await.unwrap();
        assert_eq!(last, BinaryAdvance::Completed);
        assert_eq!(completed.status, BinaryStatus::Completed);
        assert!(completed.ended_at.is_some());

        // a completed round cannot advance again
        assert_eq!(
            state.advance_binary_round(&round.id).await.unwrap_err(),
            EngineError::RoundCompleted(round.id.clone())
        );
    }
}
