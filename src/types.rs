use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type ItemId = String;
pub type RoundId = String;
pub type GroupId = String;
pub type ParticipantId = String;

/// A votable catalog entry. The engine reads these and only ever writes
/// `active` as the outcome of a binary round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub label: String,
    pub active: bool,
    pub created_at: String, // ISO timestamp
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RankedStatus {
    Setup,
    Active,
    Ended,
}

impl RankedStatus {
    /// Terminal rounds never mutate again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RankedStatus::Ended)
    }
}

impl std::fmt::Display for RankedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RankedStatus::Setup => "setup",
            RankedStatus::Active => "active",
            RankedStatus::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

/// A ranked tri-choice round: groups of three items, each participant assigns
/// every item of the current group to exactly one bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRound {
    pub id: RoundId,
    pub status: RankedStatus,
    /// Frozen at creation; only status/cursor/timestamps mutate afterwards.
    pub groups: Vec<Group>,
    /// Index into `groups`. `Some` exactly while the round is active.
    pub current_group: Option<usize>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

impl RankedRound {
    pub fn group(&self, group_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == group_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub round_id: RoundId,
    pub group_number: usize, // 0-based position within the round
    pub items: [ItemId; 3],
}

impl Group {
    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|i| i == item_id)
    }
}

/// The assignment triple a participant submits for a group: which item goes
/// in which bucket. Buckets are display roles; validation only cares that
/// the three ids are distinct and cover the group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedBallot {
    pub bucket_a: ItemId,
    pub bucket_b: ItemId,
    pub bucket_c: ItemId,
}

/// One participant's bucket assignment for one group. Unique per
/// (group, participant); re-submitting replaces the previous assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSubmission {
    pub round_id: RoundId,
    pub group_id: GroupId,
    pub participant_id: ParticipantId,
    pub bucket_a: ItemId,
    pub bucket_b: ItemId,
    pub bucket_c: ItemId,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BinaryStatus {
    Setup,
    Active,
    Completed,
}

impl BinaryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BinaryStatus::Completed)
    }
}

impl std::fmt::Display for BinaryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryStatus::Setup => "setup",
            BinaryStatus::Active => "active",
            BinaryStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BinaryChoice {
    Accept,
    Reject,
}

/// A binary accept/reject round over a shuffled pass through the catalog.
/// Retiring an item writes the majority outcome back to its `active` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryRound {
    pub id: RoundId,
    pub status: BinaryStatus,
    /// Shuffled snapshot of the full catalog, frozen at creation.
    pub order: Vec<ItemId>,
    pub current_index: usize,
    pub created_at: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

impl BinaryRound {
    pub fn current_item(&self) -> Option<&ItemId> {
        self.order.get(self.current_index)
    }

    pub fn items_remaining(&self) -> usize {
        self.order.len().saturating_sub(self.current_index + 1)
    }
}

/// One participant's verdict on one item. Unique per (round, item,
/// participant); re-voting replaces the previous choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryVote {
    pub round_id: RoundId,
    pub item_id: ItemId,
    pub participant_id: ParticipantId,
    pub choice: BinaryChoice,
    pub submitted_at: String,
}

// ========== Aggregates ==========

/// Per-item bucket counts within one group's tally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketCounts {
    pub item_id: ItemId,
    pub label: String,
    pub bucket_a: usize,
    pub bucket_b: usize,
    pub bucket_c: usize,
    pub bucket_a_pct: f64,
    pub bucket_b_pct: f64,
    pub bucket_c_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupTally {
    pub group_id: GroupId,
    pub total_submissions: usize,
    pub items: Vec<BucketCounts>,
}

/// Leaderboard line for the whole-round view. Percentages are relative to
/// this item's own vote count, not the round total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CumulativeEntry {
    pub item_id: ItemId,
    pub label: String,
    pub bucket_a: usize,
    pub bucket_b: usize,
    pub bucket_c: usize,
    pub total_votes: usize,
    pub bucket_a_pct: f64,
    pub bucket_b_pct: f64,
    pub bucket_c_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CumulativeTally {
    pub round_id: RoundId,
    pub total_submissions: usize,
    /// Items with at least one vote, sorted by `bucket_a` descending.
    pub entries: Vec<CumulativeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemTally {
    pub item_id: ItemId,
    pub label: String,
    pub accept_count: usize,
    pub reject_count: usize,
    pub total_votes: usize,
}

/// Final partition of a completed binary round. Ties appear in neither list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BinaryResults {
    pub round_id: RoundId,
    pub accepted: Vec<ItemTally>,
    pub rejected: Vec<ItemTally>,
}
