// src/state.rs
use crate::config::GridSettings;
use crate::services::store::PresenceStore;

pub struct AppState {
    pub store: PresenceStore,
    pub grid: GridSettings,
}
