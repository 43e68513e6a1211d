use phonebook_api::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("count must be a positive integer")]
    InvalidCount,

    #[error("requested {requested} records, limit is {max}")]
    TooLarge { requested: usize, max: usize },

    #[error("generator config: {0}")]
    Config(String),

    #[error("generation worker failed: {0}")]
    Worker(String),

    /// The batch transaction was rolled back; nothing was written.
    #[error("persist: {0}")]
    Persist(#[from] StoreError),
}

impl GenerateError {
    /// The request itself was unacceptable (as opposed to a store failure).
    pub fn is_rejected_input(&self) -> bool {
        matches!(self, GenerateError::InvalidCount | GenerateError::TooLarge { .. })
    }
}
