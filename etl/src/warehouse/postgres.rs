use async_trait::async_trait;
use common::Result;
use common::config::{RetryConfig, WarehouseConfig, validate_identifier};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::{Resolution, Warehouse};
use crate::models::FactRow;
use crate::utils::retry::retry_with_backoff;

/// Postgres caps a statement at 65535 bind parameters; four per row.
const INSERT_CHUNK_ROWS: usize = 1000;

/// One exclusively owned connection to the warehouse (Postgres wire
/// protocol, so Redshift works too).
pub struct PgWarehouse {
    conn: PgConnection,
    lookup_sql: String,
    insert_sql: String,
}

impl PgWarehouse {
    pub async fn connect(config: &WarehouseConfig, retry: &RetryConfig) -> Result<Self> {
        validate_identifier(&config.schema)?;
        validate_identifier(&config.fact_table)?;
        validate_identifier(&config.dimension_table)?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.username)
            .password(&config.password);

        let options = &options;
        let mut conn = retry_with_backoff(retry.max_retries, retry.base_delay_ms, move || {
            async move {
                PgConnection::connect_with(options)
                    .await
                    .map_err(common::Error::from)
            }
        })
        .await?;

        let search_path = format!("SET search_path TO {}", config.schema);
        conn.execute(search_path.as_str()).await?;

        info!(
            host = %config.host,
            database = %config.database,
            schema = %config.schema,
            "Connected to warehouse"
        );

        Ok(Self {
            conn,
            lookup_sql: format!(
                "SELECT CAST(payment_method_id AS BIGINT) FROM {} WHERE payment_method = $1",
                config.dimension_table
            ),
            insert_sql: format!(
                "INSERT INTO {} (truck_id, payment_method_id, total, at) ",
                config.fact_table
            ),
        })
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn lookup_payment_method(&mut self, label: &str) -> Result<Resolution> {
        let id: Option<i64> = sqlx::query_scalar(&self.lookup_sql)
            .bind(label)
            .fetch_optional(&mut self.conn)
            .await?;

        Ok(match id {
            Some(id) => Resolution::Resolved(id),
            None => Resolution::NotFound(label.to_string()),
        })
    }

    async fn insert_facts(&mut self, rows: &[FactRow]) -> Result<u64> {
        let mut tx = self.conn.begin().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(self.insert_sql.as_str());
            builder.push_values(chunk, |mut row, fact| {
                row.push_bind(fact.truck_id)
                    .push_bind(fact.payment_method_id)
                    .push_bind(fact.total)
                    .push_bind(fact.at);
            });

            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
            debug!(rows = chunk.len(), "Inserted fact chunk");
        }

        // Dropping `tx` on any error above rolls the whole batch back.
        tx.commit().await?;
        Ok(inserted)
    }
}
