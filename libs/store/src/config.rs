use std::time::Duration;

// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// Path used for an ephemeral, process-local database.
pub const MEMORY_PATH: &str = ":memory:";

fn default_path() -> String {
    "phonebook.db".into()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// `[database]` section.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct StoreConfig {
    /// SQLite file, or `":memory:"`.
    #[serde(default = "default_path")]
    pub path: String,
    /// How long a writer waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            path: MEMORY_PATH.into(),
            ..Self::default()
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
