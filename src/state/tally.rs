use super::AppState;
use crate::error::EngineResult;
use crate::types::*;

/// count / total as a percentage with one decimal place, 0.0 for an empty
/// denominator.
fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 1000.0 / total as f64).round() / 10.0
}

/// Majority rule for a retired binary item: more accepts keeps the item
/// active, more rejects deactivates it, a tie leaves the flag alone.
pub(crate) fn decide_outcome(accept_count: usize, reject_count: usize) -> Option<bool> {
    use std::cmp::Ordering;
    match accept_count.cmp(&reject_count) {
        Ordering::Greater => Some(true),
        Ordering::Less => Some(false),
        Ordering::Equal => None,
    }
}

impl AppState {
    /// Tally one group: per-item bucket counts and percentages against the
    /// group's submission total. Always a full scan of the submission store;
    /// there are no incremental counters to drift.
    pub async fn group_tally(&self, group_id: &str) -> EngineResult<GroupTally> {
        let (_round, group) = self.find_group(group_id).await?;

        let submissions = self.submissions.read().await;
        let group_subs: Vec<&RankedSubmission> = submissions
            .values()
            .filter(|s| s.group_id == group_id)
            .collect();
        let total = group_subs.len();
        let counts: Vec<(ItemId, usize, usize, usize)> = group
            .items
            .iter()
            .map(|item_id| {
                let a = group_subs.iter().filter(|s| &s.bucket_a == item_id).count();
                let b = group_subs.iter().filter(|s| &s.bucket_b == item_id).count();
                let c = group_subs.iter().filter(|s| &s.bucket_c == item_id).count();
                (item_id.clone(), a, b, c)
            })
            .collect();
        drop(submissions);

        let labels = self.item_labels().await;
        let items = counts
            .into_iter()
            .map(|(item_id, a, b, c)| BucketCounts {
                label: labels.get(&item_id).cloned().unwrap_or_else(|| item_id.clone()),
                item_id,
                bucket_a: a,
                bucket_b: b,
                bucket_c: c,
                bucket_a_pct: pct(a, total),
                bucket_b_pct: pct(b, total),
                bucket_c_pct: pct(c, total),
            })
            .collect();

        Ok(GroupTally {
            group_id: group.id,
            total_submissions: total,
            items,
        })
    }

    /// Whole-round leaderboard: every item that received at least one vote,
    /// sorted by `bucket_a` descending. Accumulation walks the round's
    /// stored group order, so ties keep a stable, repeatable position and
    /// two calls without new votes return identical output.
    pub async fn cumulative_tally(&self, round_id: &str) -> EngineResult<CumulativeTally> {
        let round = self.ranked_round(round_id).await?;

        let submissions = self.submissions.read().await;
        let round_subs: Vec<&RankedSubmission> = submissions
            .values()
            .filter(|s| s.round_id == round_id)
            .collect();
        let total = round_subs.len();
        let mut counts: Vec<(ItemId, usize, usize, usize)> = Vec::new();
        for group in &round.groups {
            for item_id in &group.items {
                let a = round_subs.iter().filter(|s| &s.bucket_a == item_id).count();
                let b = round_subs.iter().filter(|s| &s.bucket_b == item_id).count();
                let c = round_subs.iter().filter(|s| &s.bucket_c == item_id).count();
                if a + b + c > 0 {
                    counts.push((item_id.clone(), a, b, c));
                }
            }
        }
        drop(submissions);

        let labels = self.item_labels().await;
        let mut entries: Vec<CumulativeEntry> = counts
            .into_iter()
            .map(|(item_id, a, b, c)| {
                let total_votes = a + b + c;
                CumulativeEntry {
                    label: labels.get(&item_id).cloned().unwrap_or_else(|| item_id.clone()),
                    item_id,
                    bucket_a: a,
                    bucket_b: b,
                    bucket_c: c,
                    total_votes,
                    bucket_a_pct: pct(a, total_votes),
                    bucket_b_pct: pct(b, total_votes),
                    bucket_c_pct: pct(c, total_votes),
                }
            })
            .collect();
        entries.sort_by(|x, y| y.bucket_a.cmp(&x.bucket_a));

        Ok(CumulativeTally {
            round_id: round.id,
            total_submissions: total,
            entries,
        })
    }

    /// Accept/reject counts for one item of a binary round. One vote per
    /// participant is guaranteed by the vote store's key.
    pub async fn item_tally(&self, round_id: &str, item_id: &str) -> ItemTally {
        let (accept_count, reject_count) = self.count_choices(round_id, item_id).await;
        let label = self
            .item(item_id)
            .await
            .map(|i| i.label)
            .unwrap_or_else(|| item_id.to_string());
        ItemTally {
            item_id: item_id.to_string(),
            label,
            accept_count,
            reject_count,
            total_votes: accept_count + reject_count,
        }
    }

    pub(super) async fn count_choices(&self, round_id: &str, item_id: &str) -> (usize, usize) {
        let votes = self.binary_votes.read().await;
        let mut accept = 0;
        let mut reject = 0;
        for vote in votes.values() {
            if vote.round_id == round_id && vote.item_id == item_id {
                match vote.choice {
                    BinaryChoice::Accept => accept += 1,
                    BinaryChoice::Reject => reject += 1,
                }
            }
        }
        (accept, reject)
    }

    /// Partition a binary round's items by majority verdict. Tie items (and
    /// items nobody voted on) appear in neither list.
    pub async fn binary_results(&self, round_id: &str) -> EngineResult<BinaryResults> {
        let round = self.binary_round(round_id).await?;

        let votes = self.binary_votes.read().await;
        let counts: Vec<(ItemId, usize, usize)> = round
            .order
            .iter()
            .map(|item_id| {
                let mut accept = 0;
                let mut reject = 0;
                for vote in votes.values() {
                    if vote.round_id == round.id && &vote.item_id == item_id {
                        match vote.choice {
                            BinaryChoice::Accept => accept += 1,
                            BinaryChoice::Reject => reject += 1,
                        }
                    }
                }
                (item_id.clone(), accept, reject)
            })
            .collect();
        drop(votes);

        let labels = self.item_labels().await;
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for (item_id, accept_count, reject_count) in counts {
            let tally = ItemTally {
                label: labels.get(&item_id).cloned().unwrap_or_else(|| item_id.clone()),
                item_id,
                accept_count,
                reject_count,
                total_votes: accept_count + reject_count,
            };
            match decide_outcome(accept_count, reject_count) {
                Some(true) => accepted.push(tally),
                Some(false) => rejected.push(tally),
                None => {}
            }
        }

        Ok(BinaryResults {
            round_id: round.id,
            accepted,
            rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_rounds_to_one_decimal() {
        assert_eq!(pct(1, 3), 33.3);
        assert_eq!(pct(2, 3), 66.7);
        assert_eq!(pct(1, 7), 14.3);
        assert_eq!(pct(3, 4), 75.0);
        assert_eq!(pct(0, 5), 0.0);
    }

    #[test]
    fn test_pct_of_empty_total_is_zero() {
        assert_eq!(pct(0, 0), 0.0);
    }

    #[test]
    fn test_decide_outcome_majorities() {
        assert_eq!(decide_outcome(5, 2), Some(true));
        assert_eq!(decide_outcome(2, 5), Some(false));
    }

    #[test]
    fn test_decide_outcome_tie_is_none() {
        assert_eq!(decide_outcome(3, 3), None);
        assert_eq!(decide_outcome(0, 0), None);
    }

    #[tokio::test]
    async fn test_group_tally_without_submissions_is_zeroed() {
        let state = AppState::new();
        for i in 0..3 {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_ranked_round().await.unwrap();

        let tally = state.group_tally(&round.groups[0].id).await.unwrap();
        assert_eq!(tally.total_submissions, 0);
        assert_eq!(tally.items.len(), 3);
        for item in &tally.items {
            assert_eq!(item.bucket_a, 0);
            assert_eq!(item.bucket_a_pct, 0.0);
        }
    }

    #[tokio::test]
    async fn test_cumulative_tally_skips_unvoted_items_and_repeats_exactly() {
        let state = AppState::new();
        for i in 0..6 {
            state.add_item(format!("Item {i}"), true).await;
        }
        let round = state.create_ranked_round().await.unwrap();
        state.activate_ranked_round(&round.id).await.unwrap();

        // votes land in group 0 only; group 1's items must not appear
        let group = &round.groups[0];
        for (p, (a, b, c)) in [("p1", (0, 1, 2)), ("p2", (1, 0, 2))] {
            state
                .submit_ranked_vote(
                    &round.id,
                    &group.id,
                    p,
                    RankedBallot {
                        bucket_a: group.items[a].clone(),
                        bucket_b: group.items[b].clone(),
                        bucket_c: group.items[c].clone(),
                    },
                )
                .await
                .unwrap();
        }

        let tally = state.cumulative_tally(&round.id).await.unwrap();
        assert_eq!(tally.total_submissions, 2);
        assert_eq!(tally.entries.len(), 3);

        // items[0] and items[1] tie on bucket_a; stored order breaks the tie
        assert_eq!(tally.entries[0].item_id, group.items[0]);
        assert_eq!(tally.entries[0].bucket_a, 1);
        assert_eq!(tally.entries[1].item_id, group.items[1]);
        assert_eq!(tally.entries[1].bucket_a, 1);
        assert_eq!(tally.entries[2].item_id, group.items[2]);
        assert_eq!(tally.entries[2].bucket_a, 0);
        assert_eq!(tally.entries[2].bucket_c, 2);
        assert_eq!(tally.entries[2].bucket_c_pct, 100.0);

        let again = state.cumulative_tally(&round.id).await.unwrap();
        assert_eq!(again, tally);
    }
}
