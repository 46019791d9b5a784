//! Message store configuration.

use serde::{Deserialize, Serialize};

/// Settings for the in-process message store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Optional JSON file with users and conversations to preload.
    #[serde(default)]
    pub seed_file: Option<String>,
}
