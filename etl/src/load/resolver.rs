use common::Result;
use common::config::RetryConfig;
use std::collections::HashMap;

use crate::utils::retry::Backoff;
use crate::warehouse::{Resolution, Warehouse};

/// Resolves payment-method labels against the dimension table, remembering
/// each hit for the rest of the batch.
pub struct PaymentMethodResolver<'w, W: Warehouse + ?Sized> {
    warehouse: &'w mut W,
    retry: &'w RetryConfig,
    cache: HashMap<String, i64>,
    lookups: usize,
}

impl<'w, W: Warehouse + ?Sized> PaymentMethodResolver<'w, W> {
    pub fn new(warehouse: &'w mut W, retry: &'w RetryConfig) -> Self {
        Self {
            warehouse,
            retry,
            cache: HashMap::new(),
            lookups: 0,
        }
    }

    pub async fn resolve(&mut self, label: &str) -> Result<Resolution> {
        if let Some(id) = self.cache.get(label) {
            return Ok(Resolution::Resolved(*id));
        }

        let resolution = self.lookup(label).await?;
        if let Resolution::Resolved(id) = resolution {
            self.cache.insert(label.to_string(), id);
        }
        Ok(resolution)
    }

    /// Transient warehouse failures are retried with backoff.
    async fn lookup(&mut self, label: &str) -> Result<Resolution> {
        let mut backoff = Backoff::new(self.retry.max_retries, self.retry.base_delay_ms);

        loop {
            self.lookups += 1;
            match self.warehouse.lookup_payment_method(label).await {
                Ok(resolution) => return Ok(resolution),
                Err(e) => {
                    if !backoff.wait_after(&e).await {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Round trips made to the warehouse so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}
