//! Load stage: resolve payment methods and append the batch to the fact
//! table in one transaction.

mod loader;
mod resolver;

pub use loader::{LoadReport, load_artifact, load_records};
pub use resolver::PaymentMethodResolver;
