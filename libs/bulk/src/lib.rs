//! Bulk seeding: generate a batch of synthetic phone numbers on a bounded
//! worker pool, then persist the whole batch in one transaction.

pub mod config;
pub mod error;
mod generator;
mod number;
mod pool;

pub use config::GeneratorConfig;
pub use error::GenerateError;
pub use generator::{GenerateReport, Generator};
pub use number::NumberSource;
