use crate::protocol::{ServerMessage, Topic};
use crate::state::AppState;
use tokio::sync::broadcast;

impl AppState {
    /// Fan an event out to a topic's subscribers. Fire-and-forget: nobody
    /// listening is fine, and a slow subscriber only loses its own backlog.
    /// Events are invalidation hints, never the source of truth.
    pub fn publish(&self, topic: Topic, msg: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.topic_sender(topic).send(msg);
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<ServerMessage> {
        self.topic_sender(topic).subscribe()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<ServerMessage> {
        match topic {
            Topic::Ranked => &self.ranked_events,
            Topic::Binary => &self.binary_events,
        }
    }
}
