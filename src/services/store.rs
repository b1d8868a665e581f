use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::models::player::{PlayerRecord, SessionId};

pub type Players = BTreeMap<SessionId, PlayerRecord>;
pub type Snapshot = Arc<Players>;

/// In-process real-time store for player records.
///
/// Every write replaces the whole record and publishes the full collection to
/// all subscribers, the writer included. There is no conflict detection: the
/// last write wins.
#[derive(Clone)]
pub struct PresenceStore {
    players: Arc<Mutex<Players>>,
    tx: broadcast::Sender<Snapshot>,
}

pub struct Subscription {
    pub initial: Snapshot,
    store: PresenceStore,
    rx: broadcast::Receiver<Snapshot>,
    resync: bool,
}

impl PresenceStore {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        PresenceStore { players: Arc::new(Mutex::new(BTreeMap::new())), tx }
    }

    pub async fn set(&self, id: SessionId, record: PlayerRecord) {
        let mut players = self.players.lock().await;
        players.insert(id, record);
        self.publish(&players);
    }

    /// Returns whether a record was present.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let mut players = self.players.lock().await;
        if players.remove(id).is_none() {
            return false;
        }
        self.publish(&players);
        true
    }

    pub async fn snapshot(&self) -> Snapshot {
        Arc::new(self.players.lock().await.clone())
    }

    pub async fn subscribe(&self) -> Subscription {
        // subscribe under the lock so no write falls between snapshot and receiver
        let players = self.players.lock().await;
        let rx = self.tx.subscribe();
        Subscription { initial: Arc::new(players.clone()), store: self.clone(), rx, resync: false }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, players: &Players) {
        // no receivers is fine: nobody is watching
        let receivers = self.tx.send(Arc::new(players.clone())).unwrap_or(0);
        debug!(players = players.len(), receivers, "published snapshot");
    }
}

impl Subscription {
    /// Waits for the next snapshot. A lagging subscriber skips straight to the
    /// current state. `None` once the store is gone. Cancel safe.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if !self.resync {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "subscriber lagged, resyncing");
                    self.rx = self.rx.resubscribe();
                    self.resync = true;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
        let snapshot = self.store.snapshot().await;
        self.resync = false;
        Some(snapshot)
    }
}
