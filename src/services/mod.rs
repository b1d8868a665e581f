pub mod movement;
pub mod presence;
pub mod render;
pub mod store;
