use tokio::sync::broadcast;

/// Payloads sit in each subscriber's buffer until its receive loop drains
/// them; a slow client that falls this far behind starts losing broadcasts.
const CHANNEL_CAPACITY: usize = 256;

/// The live delivery channels of one group.
///
/// Subscribing hands back a receiver tied to this group for its whole
/// lifetime; dropping it unsubscribes, which makes unsubscription idempotent
/// and safe under disconnect races. A closed receiver never blocks delivery
/// to the rest and is reaped by the channel rather than retried.
pub struct SubscriberRegistry {
    tx: broadcast::Sender<String>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self { tx: broadcast::channel(CHANNEL_CAPACITY).0 }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Delivers `payload` to every live subscriber, returning how many were
    /// reached. A group with no subscribers swallows the broadcast.
    pub fn broadcast(&self, payload: String) -> usize {
        self.tx.send(payload).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
