use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;
use crate::phone::{NewPhone, Phone, PhoneId};

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

// ════════════════════════════════════════════════════════════════
//  Record store
// ════════════════════════════════════════════════════════════════

/// Relational record store. One process-wide instance is opened by the
/// entry point and handed to the generator and the request handlers as
/// `Arc<dyn PhoneStore>`.
pub trait PhoneStore: Send + Sync {
    /// Create the schema if it does not exist yet. Idempotent.
    fn migrate(&self) -> StoreFuture<'_, ()>;

    /// Insert every record inside one transaction.
    ///
    /// `Ok(n)` means all `n` rows are committed; any `Err` means the
    /// transaction was rolled back and none of them are visible.
    fn insert_batch(&self, phones: Vec<NewPhone>) -> StoreFuture<'_, usize>;

    fn create(&self, phone: NewPhone) -> StoreFuture<'_, Phone>;

    fn get(&self, id: PhoneId) -> StoreFuture<'_, Option<Phone>>;

    /// Replace the payload of an existing record. `None` if `id` is unknown.
    fn update(&self, id: PhoneId, phone: NewPhone) -> StoreFuture<'_, Option<Phone>>;

    /// `true` if a row was removed.
    fn delete(&self, id: PhoneId) -> StoreFuture<'_, bool>;

    /// Records ordered by id.
    fn list(&self, offset: u64, limit: u64) -> StoreFuture<'_, Vec<Phone>>;

    fn count(&self) -> StoreFuture<'_, u64>;
}
