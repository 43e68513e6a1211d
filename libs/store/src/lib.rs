mod config;
mod sqlite;

pub use config::StoreConfig;
pub use sqlite::SqliteStore;
