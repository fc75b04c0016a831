pub mod model;

pub use model::{LoadOutcome, PersistenceError, SaveData, SaveStore};

/// Save file used when none is configured.
pub const DEFAULT_SAVE_FILE: &str = "save_game.json";
