pub mod postgres;

use async_trait::async_trait;
use common::Result;

use crate::models::FactRow;

pub use postgres::PgWarehouse;

/// Outcome of looking a payment-method label up in the dimension table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(i64),
    NotFound(String),
}

#[async_trait]
pub trait Warehouse: Send {
    /// Exact-match lookup of a label's surrogate key. Unknown labels are
    /// never created.
    async fn lookup_payment_method(&mut self, label: &str) -> Result<Resolution>;

    /// Appends `rows` to the fact table inside one transaction, committed
    /// once. Either every row is persisted or none is.
    async fn insert_facts(&mut self, rows: &[FactRow]) -> Result<u64>;
}
