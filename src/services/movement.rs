use serde::{Deserialize, Serialize};

use crate::models::player::PlayerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKey {
    Up,
    Down,
    Left,
    Right,
}

impl ArrowKey {
    /// Parses a DOM `KeyboardEvent.key` name.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" => Some(ArrowKey::Up),
            "ArrowDown" => Some(ArrowKey::Down),
            "ArrowLeft" => Some(ArrowKey::Left),
            "ArrowRight" => Some(ArrowKey::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
    pub box_size: i32,
}

impl Bounds {
    pub fn max_x(&self) -> i32 {
        self.width.saturating_sub(self.box_size).max(0)
    }

    pub fn max_y(&self) -> i32 {
        self.height.saturating_sub(self.box_size).max(0)
    }

    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (x.clamp(0, self.max_x()), y.clamp(0, self.max_y()))
    }
}

/// Summed per-axis delta for the held keys, `None` if none of them is an arrow.
pub fn key_delta<'a, I>(keys: I, step: i32) -> Option<(i32, i32)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut moved = false;
    let (mut dx, mut dy) = (0i32, 0i32);
    // a held key counts once even if reported twice
    let mut seen = [false; 4];
    for key in keys.into_iter().filter_map(ArrowKey::parse) {
        let slot = key as usize;
        if seen[slot] {
            continue;
        }
        seen[slot] = true;
        moved = true;
        match key {
            ArrowKey::Up => dy = dy.saturating_sub(step),
            ArrowKey::Down => dy = dy.saturating_add(step),
            ArrowKey::Left => dx = dx.saturating_sub(step),
            ArrowKey::Right => dx = dx.saturating_add(step),
        }
    }
    moved.then_some((dx, dy))
}

pub fn apply<'a, I>(
    current: Option<&PlayerRecord>,
    keys: I,
    step: i32,
    bounds: &Bounds,
) -> Option<PlayerRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let current = current?;
    let (dx, dy) = key_delta(keys, step)?;
    let (x, y) = bounds.clamp(current.x.saturating_add(dx), current.y.saturating_add(dy));
    Some(PlayerRecord { x, y, ..current.clone() })
}
