use super::AppState;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{ServerMessage, Topic};
use crate::types::*;

impl AppState {
    /// Record a participant's bucket assignment for one group and return the
    /// group's fresh tally. Submitting again for the same group replaces the
    /// earlier assignment; the store never holds two rows for one
    /// (group, participant) pair.
    ///
    /// The round-store read guard is held across the write so the status
    /// check cannot be invalidated by a concurrent end.
    pub async fn submit_ranked_vote(
        &self,
        round_id: &str,
        group_id: &str,
        participant_id: &str,
        ballot: RankedBallot,
    ) -> EngineResult<GroupTally> {
        let rounds = self.ranked_rounds.read().await;
        let round = rounds
            .get(round_id)
            .ok_or_else(|| EngineError::RoundNotFound(round_id.to_string()))?;
        if round.status != RankedStatus::Active {
            return Err(EngineError::RoundNotActive(round.id.clone()));
        }
        let group = round
            .group(group_id)
            .ok_or_else(|| EngineError::GroupNotFound(group_id.to_string()))?;

        if ballot.bucket_a == ballot.bucket_b
            || ballot.bucket_a == ballot.bucket_c
            || ballot.bucket_b == ballot.bucket_c
        {
            return Err(EngineError::DuplicateAssignment);
        }
        for item_id in [&ballot.bucket_a, &ballot.bucket_b, &ballot.bucket_c] {
            if !group.contains(item_id) {
                return Err(EngineError::ItemNotInGroup(item_id.clone()));
            }
        }
        // three distinct ids, all drawn from a group of three: set equality

        let submission = RankedSubmission {
            round_id: round.id.clone(),
            group_id: group.id.clone(),
            participant_id: participant_id.to_string(),
            bucket_a: ballot.bucket_a,
            bucket_b: ballot.bucket_b,
            bucket_c: ballot.bucket_c,
            submitted_at: chrono::Utc::now().to_rfc3339(),
        };
        self.submissions
            .write()
            .await
            .insert((group.id.clone(), participant_id.to_string()), submission);
        drop(rounds);

        tracing::debug!(round_id, group_id, participant_id, "Ranked vote stored");
        let tally = self.group_tally(group_id).await?;
        self.publish(
            Topic::Ranked,
            ServerMessage::TallyUpdated {
                tally: tally.clone(),
            },
        );
        Ok(tally)
    }

    /// Record a participant's verdict on the item currently on stage and
    /// return the item's fresh tally. Votes for items that are not current,
    /// retired or still upcoming alike, are rejected; that is what freezes
    /// an item's outcome at the moment it retires.
    pub async fn submit_binary_vote(
        &self,
        round_id: &str,
        item_id: &str,
        participant_id: &str,
        choice: BinaryChoice,
    ) -> EngineResult<ItemTally> {
        let rounds = self.binary_rounds.read().await;
        let round = rounds
            .get(round_id)
            .ok_or_else(|| EngineError::RoundNotFound(round_id.to_string()))?;
        if round.status != BinaryStatus::Active {
            return Err(EngineError::RoundNotActive(round.id.clone()));
        }
        if !round.order.iter().any(|i| i == item_id) {
            return Err(EngineError::ItemNotInRound(item_id.to_string()));
        }
        if round.current_item().map(|i| i.as_str()) != Some(item_id) {
            return Err(EngineError::ItemNotCurrent(item_id.to_string()));
        }

        let vote = BinaryVote {
            round_id: round.id.clone(),
            item_id: item_id.to_string(),
            participant_id: participant_id.to_string(),
            choice,
            submitted_at: chrono::Utc::now().to_rfc3339(),
        };
        self.binary_votes.write().await.insert(
            (
                round.id.clone(),
                item_id.to_string(),
                participant_id.to_string(),
            ),
            vote,
        );
        drop(rounds);

        tracing::debug!(round_id, item_id, participant_id, "Binary vote stored");
        let tally = self.item_tally(round_id, item_id).await;
        self.publish(
            Topic::Binary,
            ServerMessage::ItemTallyUpdated {
                tally: tally.clone(),
            },
        );
        Ok(tally)
    }

    pub async fn group_submission_count(&self, group_id: &str) -> usize {
        self.submissions
            .read()
            .await
            .values()
            .filter(|s| s.group_id == group_id)
            .count()
    }

    /// A participant's stored assignment for a group, for reconnect recovery.
    pub async fn participant_submission(
        &self,
        group_id: &str,
        participant_id: &str,
    ) -> Option<RankedSubmission> {
        self.submissions
            .read()
            .await
            .get(&(group_id.to_string(), participant_id.to_string()))
            .cloned()
    }

    /// A participant's stored verdict on an item, for reconnect recovery.
    pub async fn participant_binary_vote(
        &self,
        round_id: &str,
        item_id: &str,
        participant_id: &str,
    ) -> Option<BinaryVote> {
        self.binary_votes
            .read()
            .await
            .get(&(
                round_id.to_string(),
                item_id.to_string(),
                participant_id.to_string(),
            ))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn active_ranked_round(state: &AppState, items: usize) -> RankedRound {
        for i in 0..items {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_ranked_round().await.unwrap();
        state.activate_ranked_round(&round.id).await.unwrap()
    }

    fn ballot(group: &Group, a: usize, b: usize, c: usize) -> RankedBallot {
        RankedBallot {
            bucket_a: group.items[a].clone(),
            bucket_b: group.items[b].clone(),
            bucket_c: group.items[c].clone(),
        }
    }

    #[tokio::test]
    async fn test_submit_ranked_vote_returns_fresh_tally() {
        let state = AppState::new();
        let round = active_ranked_round(&state, 3).await;
        let group = &round.groups[0];

        let tally = state
            .submit_ranked_vote(&round.id, &group.id, "p1", ballot(group, 0, 1, 2))
            .await
            .unwrap();

        assert_eq!(tally.total_submissions, 1);
        assert_eq!(tally.items[0].bucket_a, 1);
        assert_eq!(tally.items[0].bucket_a_pct, 100.0);
        assert_eq!(tally.items[1].bucket_b, 1);
        assert_eq!(tally.items[2].bucket_c, 1);
    }

    #[tokio::test]
    async fn test_resubmit_replaces_instead_of_duplicating() {
        let state = AppState::new();
        let round = active_ranked_round(&state, 3).await;
        let group = &round.groups[0];

        state
            .submit_ranked_vote(&round.id, &group.id, "p1", ballot(group, 0, 1, 2))
            .await
            .unwrap();
        let tally = state
            .submit_ranked_vote(&round.id, &group.id, "p1", ballot(group, 2, 1, 0))
            .await
            .unwrap();

        assert_eq!(state.submissions.read().await.len(), 1);
        assert_eq!(tally.total_submissions, 1);
        // the stored row reflects the second submission
        let stored = state.participant_submission(&group.id, "p1").await.unwrap();
        assert_eq!(stored.bucket_a, group.items[2]);
        assert_eq!(stored.bucket_c, group.items[0]);
    }

    #[tokio::test]
    async fn test_bucket_counts_sum_to_three_per_submission() {
        let state = AppState::new();
        let round = active_ranked_round(&state, 3).await;
        let group = &round.groups[0];

        for (participant, (a, b, c)) in [(0, 1, 2), (1, 2, 0), (0, 2, 1), (2, 0, 1)]
            .into_iter()
            .enumerate()
        {
            state
                .submit_ranked_vote(
                    &round.id,
                    &group.id,
                    &format!("p{participant}"),
                    ballot(group, a, b, c),
                )
                .await
                .unwrap();
        }

        let tally = state.group_tally(&group.id).await.unwrap();
        let sum: usize = tally
            .items
            .iter()
            .map(|i| i.bucket_a + i.bucket_b + i.bucket_c)
            .sum();
        assert_eq!(tally.total_submissions, 4);
        assert_eq!(sum, 3 * tally.total_submissions);
    }

    #[tokio::test]
    async fn test_duplicate_assignment_rejected_without_a_write() {
        let state = AppState::new();
        let round = active_ranked_round(&state, 3).await;
        let group = &round.groups[0];

        let result = state
            .submit_ranked_vote(&round.id, &group.id, "p1", ballot(group, 0, 0, 2))
            .await;
        assert_eq!(result.unwrap_err(), EngineError::DuplicateAssignment);
        assert!(state.submissions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_item_rejected() {
        let state = AppState::new();
        let round = active_ranked_round(&state, 6).await;
        let group = &round.groups[0];
        let foreign = round.groups[1].items[0].clone();

        let mut bad = ballot(group, 0, 1, 2);
        bad.bucket_c = foreign.clone();
        let result = state
            .submit_ranked_vote(&round.id, &group.id, "p1", bad)
            .await;
        assert_eq!(result.unwrap_err(), EngineError::ItemNotInGroup(foreign));
        assert!(state.submissions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_ranked_vote_requires_active_round() {
        let state = AppState::new();
        for i in 0..3 {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_ranked_round().await.unwrap();
        let group = round.groups[0].clone();

        // still in setup
        let result = state
            .submit_ranked_vote(&round.id, &group.id, "p1", ballot(&group, 0, 1, 2))
            .await;
        assert!(matches!(result.unwrap_err(), EngineError::RoundNotActive(_)));

        // and again after ending
        state.activate_ranked_round(&round.id).await.unwrap();
        state.end_ranked_round(&round.id).await.unwrap();
        let result = state
            .submit_ranked_vote(&round.id, &group.id, "p1", ballot(&group, 0, 1, 2))
            .await;
        assert!(matches!(result.unwrap_err(), EngineError::RoundNotActive(_)));
    }

    #[tokio::test]
    async fn test_ranked_vote_unknown_round_and_group() {
        let state = AppState::new();
        let round = active_ranked_round(&state, 3).await;
        let group = round.groups[0].clone();

        assert!(matches!(
            state
                .submit_ranked_vote("missing", &group.id, "p1", ballot(&group, 0, 1, 2))
                .await
                .unwrap_err(),
            EngineError::RoundNotFound(_)
        ));
        assert!(matches!(
            state
                .submit_ranked_vote(&round.id, "missing", "p1", ballot(&group, 0, 1, 2))
                .await
                .unwrap_err(),
            EngineError::GroupNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_votes_on_earlier_groups_still_count() {
        let state = AppState::new();
        let round = active_ranked_round(&state, 6).await;
        state.advance_ranked_round(&round.id).await.unwrap();

        // cursor is on group 1, but group 0 still accepts votes
        let group = &round.groups[0];
        let tally = state
            .submit_ranked_vote(&round.id, &group.id, "late", ballot(group, 0, 1, 2))
            .await
            .unwrap();
        assert_eq!(tally.total_submissions, 1);
    }

    #[tokio::test]
    async fn test_binary_revote_replaces_choice() {
        let state = AppState::new();
        for i in 0..3 {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_binary_round().await.unwrap();
        let item = round.order[0].clone();

        state
            .submit_binary_vote(&round.id, &item, "p1", BinaryChoice::Accept)
            .await
            .unwrap();
        let tally = state
            .submit_binary_vote(&round.id, &item, "p1", BinaryChoice::Reject)
            .await
            .unwrap();

        assert_eq!(state.binary_votes.read().await.len(), 1);
        assert_eq!(tally.accept_count, 0);
        assert_eq!(tally.reject_count, 1);
    }

    #[tokio::test]
    async fn test_binary_tally_counts_distinct_participants() {
        let state = AppState::new();
        for i in 0..3 {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_binary_round().await.unwrap();
        let item = round.order[0].clone();

        for p in ["p1", "p2", "p3"] {
            state
                .submit_binary_vote(&round.id, &item, p, BinaryChoice::Accept)
                .await
                .unwrap();
        }
        state
            .submit_binary_vote(&round.id, &item, "p4", BinaryChoice::Reject)
            .await
            .unwrap();
        // p1 changes their mind; the totals must not grow
        let tally = state
            .submit_binary_vote(&round.id, &item, "p1", BinaryChoice::Reject)
            .await
            .unwrap();

        assert_eq!(tally.accept_count + tally.reject_count, 4);
        assert_eq!(tally.accept_count, 2);
        assert_eq!(tally.reject_count, 2);
    }

    #[tokio::test]
    async fn test_binary_vote_must_target_current_item() {
        let state = AppState::new();
        for i in 0..3 {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_binary_round().await.unwrap();
        let upcoming = round.order[1].clone();

        // not on stage yet
        let result = state
            .submit_binary_vote(&round.id, &upcoming, "p1", BinaryChoice::Accept)
            .await;
        assert_eq!(
            result.unwrap_err(),
            EngineError::ItemNotCurrent(upcoming.clone())
        );

        // retired items are just as closed
        let retired = round.order[0].clone();
        state.advance_binary_round(&round.id).await.unwrap();
        let result = state
            .submit_binary_vote(&round.id, &retired, "p1", BinaryChoice::Accept)
            .await;
        assert_eq!(result.unwrap_err(), EngineError::ItemNotCurrent(retired));

        // the new current item accepts votes
        assert!(state
            .submit_binary_vote(&round.id, &upcoming, "p1", BinaryChoice::Accept)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_binary_vote_unknown_item() {
        let state = AppState::new();
        for i in 0..3 {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_binary_round().await.unwrap();

        let result = state
            .submit_binary_vote(&round.id, "not-an-item", "p1", BinaryChoice::Accept)
            .await;
        assert_eq!(
            result.unwrap_err(),
            EngineError::ItemNotInRound("not-an-item".into())
        );
    }

    #[tokio::test]
    async fn test_concurrent_votes_for_one_key_collapse_to_one_row() {
        let state = AppState::new();
        for i in 0..3 {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_binary_round().await.unwrap();
        let item = round.order[0].clone();

        let mut handles = Vec::new();
        for n in 0..16 {
            let state = state.clone();
            let round_id = round.id.clone();
            let item = item.clone();
            handles.push(tokio::spawn(async move {
                let choice = if n % 2 == 0 {
                    BinaryChoice::Accept
                } else {
                    BinaryChoice::Reject
                };
                state
                    .submit_binary_vote(&round_id, &item, "same-participant", choice)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(state.binary_votes.read().await.len(), 1);
        let tally = state.item_tally(&round.id, &item).await;
        assert_eq!(tally.total_votes, 1);
    }
}
