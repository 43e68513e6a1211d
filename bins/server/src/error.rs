use phonebook_api::StoreError;
use phonebook_bulk::GenerateError;
use phonebook_hub::HubError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Generate(#[from] GenerateError),

    #[error("hub: {0}")]
    Hub(#[from] HubError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
