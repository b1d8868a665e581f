use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::services::movement::Bounds;

/// Largest accepted canvas side, in pixels.
pub const MAX_CANVAS: i32 = 100_000;

/// Canvas geometry and movement rules shared by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSettings {
    pub bounds: Bounds,
    pub step: i32,
    pub start_x: i32,
    pub start_y: i32,
}

pub struct Config {
    pub bind_addr: SocketAddr,
    pub grid: GridSettings,
    pub channel_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let grid = GridSettings {
            bounds: Bounds {
                width: var_or(&lookup, "CANVAS_WIDTH", 500)?,
                height: var_or(&lookup, "CANVAS_HEIGHT", 500)?,
                box_size: var_or(&lookup, "BOX_SIZE", 50)?,
            },
            step: var_or(&lookup, "STEP", 10)?,
            start_x: var_or(&lookup, "START_X", 100)?,
            start_y: var_or(&lookup, "START_Y", 100)?,
        };
        for (key, side) in [("CANVAS_WIDTH", grid.bounds.width), ("CANVAS_HEIGHT", grid.bounds.height)] {
            anyhow::ensure!((1..=MAX_CANVAS).contains(&side), "{key} must be between 1 and {MAX_CANVAS}");
        }
        anyhow::ensure!(grid.bounds.box_size > 0, "BOX_SIZE must be positive");
        anyhow::ensure!(grid.step > 0, "STEP must be positive");

        Ok(Config {
            bind_addr: var_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            grid,
            channel_capacity: var_or(&lookup, "CHANNEL_CAPACITY", 128)?,
        })
    }
}

fn var_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
