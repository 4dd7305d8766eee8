//! PostgreSQL price store.
//!
//! Observations land in a single append-only `asset_prices` table. Prices
//! cross the column boundary as `Decimal` so NUMERIC keeps exact digits;
//! the rest of the system works in `f64`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use monitor_core::{
    error::{MonitorError, Result},
    model::PriceObservation,
    store::PriceStore,
};

/// Digits kept after the decimal point; matches the NUMERIC scale below
const PRICE_SCALE: u32 = 8;

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS asset_prices (
        id BIGSERIAL PRIMARY KEY,
        symbol VARCHAR(20) NOT NULL,
        price NUMERIC(20, 8) NOT NULL,
        variation NUMERIC(20, 8),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
";

const CREATE_INDEX: &str = r"
    CREATE INDEX IF NOT EXISTS asset_prices_symbol_created_at_idx
        ON asset_prices (symbol, created_at DESC)
";

/// Price store backed by a `PostgreSQL` connection pool.
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        Self::with_max_connections(database_url, 5, acquire_timeout).await
    }

    /// Connect with a custom pool size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn with_max_connections(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| MonitorError::Persist(format!("connect: {e}")))?;

        info!(max_connections, "PostgreSQL connection pool initialized");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (for testing).
    #[must_use]
    pub const fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_observation(row: &PgRow) -> Result<PriceObservation> {
        let field = |name: &str, e: sqlx::Error| MonitorError::Query(format!("{name}: {e}"));

        let symbol: String = row.try_get("symbol").map_err(|e| field("symbol", e))?;
        let price: Decimal = row.try_get("price").map_err(|e| field("price", e))?;
        let variation: Option<Decimal> =
            row.try_get("variation").map_err(|e| field("variation", e))?;
        let observed_at: DateTime<Utc> =
            row.try_get("created_at").map_err(|e| field("created_at", e))?;

        Ok(PriceObservation {
            symbol,
            price: from_decimal("price", price)?,
            variation: variation.map(|v| from_decimal("variation", v)).transpose()?,
            observed_at,
        })
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn initialize(&self) -> Result<()> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| MonitorError::Persist(format!("schema: {e}")))?;
        }

        info!("Table asset_prices is ready");
        Ok(())
    }

    async fn append(&self, observation: &PriceObservation) -> Result<()> {
        let price = to_decimal("price", observation.price)?;
        let variation = observation
            .variation
            .map(|v| to_decimal("variation", v))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO asset_prices (symbol, price, variation, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&observation.symbol)
        .bind(price)
        .bind(variation)
        .bind(observation.observed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| MonitorError::Persist(e.to_string()))?;

        debug!(symbol = %observation.symbol, "Price saved to database");
        Ok(())
    }

    async fn latest(&self, symbol: &str) -> Result<Option<PriceObservation>> {
        let row = sqlx::query(
            r"
            SELECT symbol, price, variation, created_at
            FROM asset_prices
            WHERE symbol = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MonitorError::Query(e.to_string()))?;

        row.as_ref().map(Self::row_to_observation).transpose()
    }
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(PRICE_SCALE))
        .ok_or_else(|| {
            MonitorError::Persist(format!("{field} {value} cannot be stored as NUMERIC"))
        })
}

fn from_decimal(field: &str, value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| MonitorError::Query(format!("{field} {value} does not fit in f64")))
}
