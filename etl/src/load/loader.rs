use common::config::RetryConfig;
use common::{Error, Result};
use std::path::Path;
use tracing::info;

use super::resolver::PaymentMethodResolver;
use crate::models::{CleanedRecord, FactRow};
use crate::transform::read_combined;
use crate::warehouse::{Resolution, Warehouse};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub lookups: usize,
    pub inserted: u64,
}

/// Reads the combined artifact and loads it.
pub async fn load_artifact<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    artifact: &Path,
    retry: &RetryConfig,
) -> Result<LoadReport> {
    let records = read_combined(artifact)?;
    info!(artifact = %artifact.display(), rows = records.len(), "Loading combined artifact");
    load_records(warehouse, &records, retry).await
}

/// Resolves every row before touching the fact table; an unknown label
/// aborts the batch with nothing inserted.
pub async fn load_records<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    records: &[CleanedRecord],
    retry: &RetryConfig,
) -> Result<LoadReport> {
    let mut batch = Vec::with_capacity(records.len());
    let lookups = {
        let mut resolver = PaymentMethodResolver::new(&mut *warehouse, retry);
        for record in records {
            let payment_method_id = match resolver.resolve(&record.payment_method).await? {
                Resolution::Resolved(id) => id,
                Resolution::NotFound(label) => return Err(Error::PaymentMethodNotFound(label)),
            };

            batch.push(FactRow {
                truck_id: i64::from(record.truck_id),
                payment_method_id,
                total: record.total,
                at: record.timestamp,
            });
        }
        resolver.lookups()
    };

    let inserted = if batch.is_empty() {
        0
    } else {
        warehouse.insert_facts(&batch).await?
    };

    info!(rows = records.len(), lookups, inserted, "Loaded fact rows");

    Ok(LoadReport {
        rows_read: records.len(),
        lookups,
        inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeWarehouse {
        labels: HashMap<String, i64>,
        facts: Vec<FactRow>,
        lookups: usize,
        insert_calls: usize,
        /// Lookups that fail with a dropped connection before answering.
        flaky_lookups: usize,
    }

    #[async_trait]
    impl Warehouse for FakeWarehouse {
        async fn lookup_payment_method(&mut self, label: &str) -> Result<Resolution> {
            self.lookups += 1;
            if self.flaky_lookups > 0 {
                self.flaky_lookups -= 1;
                return Err(Error::Database(sqlx::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ))));
            }
            Ok(match self.labels.get(label) {
                Some(id) => Resolution::Resolved(*id),
                None => Resolution::NotFound(label.to_string()),
            })
        }

        async fn insert_facts(&mut self, rows: &[FactRow]) -> Result<u64> {
            self.insert_calls += 1;
            self.facts.extend_from_slice(rows);
            Ok(rows.len() as u64)
        }
    }

    fn warehouse() -> FakeWarehouse {
        FakeWarehouse {
            labels: HashMap::from([("card".to_string(), 1), ("cash".to_string(), 2)]),
            ..Default::default()
        }
    }

    fn retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay_ms: 1,
        }
    }

    fn record(method: &str, total: f64, truck_id: u32) -> CleanedRecord {
        CleanedRecord {
            timestamp: parse_timestamp("2024-12-01 00:15:00").unwrap(),
            payment_method: method.to_string(),
            total,
            truck_id,
        }
    }

    #[tokio::test]
    async fn test_load_resolves_and_inserts_once() {
        let mut wh = warehouse();
        let records = vec![
            record("card", 3.5, 1),
            record("cash", 4.0, 1),
            record("card", 9.0, 2),
        ];

        let report = load_records(&mut wh, &records, &retry(0)).await.unwrap();

        assert_eq!(report.inserted, 3);
        assert_eq!(report.lookups, 2);
        assert_eq!(wh.lookups, 2);
        assert_eq!(wh.insert_calls, 1);
        assert_eq!(
            wh.facts
                .iter()
                .map(|f| (f.truck_id, f.payment_method_id))
                .collect::<Vec<_>>(),
            vec![(1, 1), (1, 2), (2, 1)]
        );
    }

    #[tokio::test]
    async fn test_unknown_label_aborts_without_insert() {
        let mut wh = warehouse();
        let records = vec![
            record("card", 3.5, 1),
            record("barter", 4.0, 1),
            record("cash", 1.0, 1),
        ];

        let result = load_records(&mut wh, &records, &retry(0)).await;

        assert!(matches!(result, Err(Error::PaymentMethodNotFound(ref l)) if l == "barter"));
        assert_eq!(wh.insert_calls, 0);
        assert!(wh.facts.is_empty());
    }

    #[tokio::test]
    async fn test_transient_lookup_failure_is_retried() {
        let mut wh = FakeWarehouse {
            flaky_lookups: 2,
            ..warehouse()
        };
        let records = vec![record("card", 3.5, 1), record("cash", 4.0, 1)];

        let report = load_records(&mut wh, &records, &retry(3)).await.unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.lookups, 4);
        assert_eq!(wh.insert_calls, 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_past_budget_inserts_nothing() {
        let mut wh = FakeWarehouse {
            flaky_lookups: 5,
            ..warehouse()
        };
        let records = vec![record("card", 3.5, 1)];

        let result = load_records(&mut wh, &records, &retry(1)).await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(wh.lookups, 2);
        assert_eq!(wh.insert_calls, 0);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_insert() {
        let mut wh = warehouse();

        let report = load_records(&mut wh, &[], &retry(0)).await.unwrap();

        assert_eq!(report, LoadReport::default());
        assert_eq!(wh.insert_calls, 0);
    }

    #[tokio::test]
    async fn test_reloading_same_artifact_duplicates_rows() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("combined_data.csv");
        crate::transform::write_combined(&artifact, &[record("cash", 2.5, 3)]).unwrap();
        let mut wh = warehouse();

        load_artifact(&mut wh, &artifact, &retry(0)).await.unwrap();
        load_artifact(&mut wh, &artifact, &retry(0)).await.unwrap();

        assert_eq!(wh.facts.len(), 2);
        assert_eq!(wh.facts[0], wh.facts[1]);
    }
}
