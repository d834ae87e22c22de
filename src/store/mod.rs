pub mod local;
pub mod relay;

pub use local::LocalStore;
pub use relay::{Frame, RelayState, RelayStore};

use thiserror::Error;

/// Fixed key under which the preference list is persisted.
pub const STORAGE_KEY: &str = "multi_tz_zones";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed preference data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame transport error: {0}")]
    Frame(String),
}

/// Outcome of a [`PreferenceStore::load`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Load {
    Ready(Vec<String>),
    /// The list arrives later through the relay's inbound message path.
    Pending,
}

/// Saved list of timezone ids.  Insertion order is display order; uniqueness
/// is not enforced here, the dialog's toggle semantics prevent duplicates.
pub trait PreferenceStore {
    fn load(&mut self) -> Result<Load, StoreError>;
    fn save(&mut self, zones: &[String]) -> Result<(), StoreError>;
}
