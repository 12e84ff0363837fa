//! Utility helpers.

mod pinned;

pub use pinned::{PinnedTask, spawn_pinned};
