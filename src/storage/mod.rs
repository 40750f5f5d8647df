//! Persistence layer.
//!
//! Deals are stored in SQLite through sqlx. The `listing_id` column is
//! unique, so a listing reported again after a restart (or by a second
//! strategy) is ignored rather than duplicated.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use crate::types::Deal;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS deals (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    listing_id  TEXT NOT NULL UNIQUE,
    strategy    TEXT NOT NULL,
    name        TEXT NOT NULL,
    image_url   TEXT,
    profit      TEXT NOT NULL,
    details     TEXT NOT NULL,
    url         TEXT NOT NULL,
    created_at  TEXT NOT NULL
)";

/// A deal as read back from the store.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredDeal {
    pub id: i64,
    #[serde(flatten)]
    pub deal: Deal,
    pub created_at: DateTime<Utc>,
}

/// Where found deals end up.
#[async_trait]
pub trait DealStore: Send + Sync {
    /// Insert a batch, skipping listings already stored. Returns how many
    /// rows were actually added.
    async fn insert_deals(&self, deals: &[Deal]) -> Result<usize>;

    /// All stored deals, newest first.
    async fn list_deals(&self) -> Result<Vec<StoredDeal>>;

    /// Remove every deal. Returns the number removed.
    async fn clear(&self) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct DealRow {
    id: i64,
    listing_id: String,
    strategy: String,
    name: String,
    image_url: Option<String>,
    profit: String,
    details: String,
    url: String,
    created_at: String,
}

impl TryFrom<DealRow> for StoredDeal {
    type Error = anyhow::Error;

    fn try_from(row: DealRow) -> Result<Self> {
        let profit = Decimal::from_str(&row.profit)
            .with_context(|| format!("Bad profit for deal {}: {}", row.id, row.profit))?;
        let details = serde_json::from_str(&row.details)
            .with_context(|| format!("Bad details JSON for deal {}", row.id))?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .with_context(|| format!("Bad timestamp for deal {}", row.id))?
            .with_timezone(&Utc);

        Ok(StoredDeal {
            id: row.id,
            deal: Deal {
                strategy: row.strategy,
                listing_id: row.listing_id,
                name: row.name,
                image_url: row.image_url,
                profit,
                details,
                url: row.url,
            },
            created_at,
        })
    }
}

/// SQLite-backed deal store.
#[derive(Clone)]
pub struct SqliteDealStore {
    pool: SqlitePool,
}

impl SqliteDealStore {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {url}"))?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url, "Deal store ready");
        Ok(store)
    }

    /// Private in-memory database. A single long-lived connection keeps
    /// the data alive for the lifetime of the store.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory database URL")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to create deals table")?;
        Ok(())
    }
}

#[async_trait]
impl DealStore for SqliteDealStore {
    async fn insert_deals(&self, deals: &[Deal]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut stored = 0usize;

        for deal in deals {
            let details =
                serde_json::to_string(&deal.details).context("Failed to serialise deal details")?;
            let result = sqlx::query(
                "INSERT OR IGNORE INTO deals
                    (listing_id, strategy, name, image_url, profit, details, url, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&deal.listing_id)
            .bind(&deal.strategy)
            .bind(&deal.name)
            .bind(&deal.image_url)
            .bind(deal.profit.to_string())
            .bind(details)
            .bind(&deal.url)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert deal for listing {}", deal.listing_id))?;

            if result.rows_affected() > 0 {
                stored += 1;
            } else {
                debug!(listing_id = %deal.listing_id, "Deal already stored");
            }
        }

        tx.commit().await.context("Failed to commit deals")?;
        Ok(stored)
    }

    async fn list_deals(&self) -> Result<Vec<StoredDeal>> {
        let rows: Vec<DealRow> = sqlx::query_as(
            "SELECT id, listing_id, strategy, name, image_url, profit, details, url, created_at
             FROM deals ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load deals")?;

        rows.into_iter().map(StoredDeal::try_from).collect()
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM deals")
            .execute(&self.pool)
            .await
            .context("Failed to clear deals")?;
        info!(removed = result.rows_affected(), "Deal store cleared");
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
