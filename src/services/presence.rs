use tracing::{debug, info};

use crate::config::GridSettings;
use crate::models::player::{new_session_id, random_color, PlayerRecord, SessionId};
use crate::services::movement;
use crate::services::store::{PresenceStore, Snapshot};

/// One connected player's side of the presence protocol.
///
/// The session is the only writer of its record, so `local` is whatever it
/// last wrote. Key input is only accepted once that record has come back in a
/// store notification (`loaded`); after that, moves build on `local` without
/// waiting for each write to round-trip.
pub struct PresenceSession {
    id: SessionId,
    store: PresenceStore,
    settings: GridSettings,
    local: Option<PlayerRecord>,
    color: String,
    joined: bool,
    loaded: bool,
}

impl PresenceSession {
    pub fn new(store: PresenceStore, settings: GridSettings) -> Self {
        PresenceSession {
            id: new_session_id(),
            store,
            settings,
            local: None,
            color: random_color(),
            joined: false,
            loaded: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Publishes our record. A repeat join keeps the position and only
    /// changes the name.
    pub async fn join(&mut self, name: Option<String>) -> PlayerRecord {
        let (x, y) = match &self.local {
            Some(current) => (current.x, current.y),
            None => self.settings.bounds.clamp(self.settings.start_x, self.settings.start_y),
        };
        let record = PlayerRecord::new(x, y, self.color.clone(), name);
        self.store.set(self.id, record.clone()).await;
        self.local = Some(record.clone());
        self.joined = true;
        info!(session = %self.id, name = ?record.name, color = %record.color, "player joined");
        record
    }

    /// Marks our record as loaded once a notification carries it. Snapshots
    /// can trail our own writes, so they never replace `local`.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        if self.joined && snapshot.contains_key(&self.id) {
            self.loaded = true;
        }
    }

    /// Moves our box for the held keys. Returns the written record, or `None`
    /// when nothing was written.
    pub async fn handle_keys<'a, I>(&mut self, keys: I) -> Option<PlayerRecord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if !self.joined || !self.loaded {
            debug!(session = %self.id, "keys before own record loaded ignored");
            return None;
        }
        let next = movement::apply(self.local.as_ref(), keys, self.settings.step, &self.settings.bounds)?;
        self.store.set(self.id, next.clone()).await;
        self.local = Some(next.clone());
        Some(next)
    }

    pub async fn leave(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        self.loaded = false;
        self.local = None;
        if self.store.remove(&self.id).await {
            info!(session = %self.id, "player left");
        }
    }
}
