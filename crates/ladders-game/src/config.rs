//! Board generator configuration.

use serde::{Deserialize, Serialize};

/// How many snakes and ladders to place, and how hard to try.
///
/// The counts are targets, not guarantees: a feature whose placement keeps
/// colliding with already-used cells is dropped after `max_attempts` tries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Snakes to place.
    pub snakes: usize,

    /// Ladders to place.
    pub ladders: usize,

    /// Placement attempts per feature before giving up on it.
    pub max_attempts: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            snakes: 6,
            ladders: 6,
            max_attempts: 200,
        }
    }
}
