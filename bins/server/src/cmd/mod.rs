pub mod generate;
pub mod migrate;
pub mod serve;

use std::sync::Arc;

use phonebook_api::PhoneStore;
use phonebook_store::SqliteStore;

use crate::config::{Commands, ServerConfig};
use crate::error::ServerError;

impl Commands {
    pub(crate) async fn run(self) -> Result<(), ServerError> {
        match self {
            Commands::Serve(args) => serve::run(args).await,
            Commands::Generate(args) => generate::run(args).await,
            Commands::Migrate(args) => migrate::run(args).await,
        }
    }
}

/// Open the configured store and make sure the schema exists.
pub(crate) async fn open_store(config: &ServerConfig) -> Result<Arc<dyn PhoneStore>, ServerError> {
    let store = SqliteStore::open(&config.database)?;
    store.migrate().await?;
    tracing::info!(path = %config.database.path, "store ready");
    Ok(Arc::new(store))
}
