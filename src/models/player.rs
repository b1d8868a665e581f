use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_NAME_CHARS: usize = 16;

pub type SessionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub x: i32,
    pub y: i32,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PlayerRecord {
    pub fn new(x: i32, y: i32, color: String, name: Option<String>) -> Self {
        PlayerRecord { x, y, color, name: name.as_deref().and_then(display_name) }
    }

    /// Name shown in the sidebar: the display name, or a short form of the id.
    pub fn label(&self, id: &SessionId) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => id.simple().to_string()[..8].to_string(),
        }
    }
}

/// Trims and truncates a user-supplied name. Blank input means no name.
pub fn display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_NAME_CHARS).collect())
}

pub fn new_session_id() -> SessionId {
    Uuid::new_v4()
}

pub fn random_color() -> String {
    let rgb: u32 = rand::random_range(0..=0xFF_FFFF);
    format!("#{:06x}", rgb)
}
