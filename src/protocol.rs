use crate::types::*;
use serde::{Deserialize, Serialize};

/// Protocol version sent in the subscription greeting.
pub const PROTOCOL_VERSION: &str = "triage/1";

/// The two broadcast topics, one per game mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Ranked,
    Binary,
}

/// Push events fanned out to subscribers. Every event is safe to receive
/// more than once; clients treat them as invalidation hints and re-pull the
/// authoritative state over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Per-connection greeting, not broadcast.
    Subscribed {
        protocol: String,
        topic: Topic,
        server_now: String,
    },
    /// A round went live (ranked activation or binary creation).
    RoundActivated {
        round_id: RoundId,
    },
    /// The operator moved the cursor; `index` is the new group or item index.
    RoundAdvanced {
        round_id: RoundId,
        index: usize,
    },
    RoundEnded {
        round_id: RoundId,
    },
    /// Fresh tally for the group a vote just landed in.
    TallyUpdated {
        tally: GroupTally,
    },
    /// Fresh tally for the binary item a vote just landed on.
    ItemTallyUpdated {
        tally: ItemTally,
    },
    /// The binary round ran out of items and is now terminal.
    BinaryCompleted {
        round_id: RoundId,
    },
    Error {
        code: String,
        msg: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_snake_case_tag() {
        let msg = ServerMessage::RoundAdvanced {
            round_id: "r1".into(),
            index: 2,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "round_advanced");
        assert_eq!(json["round_id"], "r1");
        assert_eq!(json["index"], 2);
    }

    #[test]
    fn test_topic_parses_from_lowercase() {
        let topic: Topic = serde_json::from_str("\"binary\"").unwrap();
        assert_eq!(topic, Topic::Binary);
    }
}
