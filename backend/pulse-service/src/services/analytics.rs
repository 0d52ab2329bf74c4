use async_trait::async_trait;
use clickhouse::{Client, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ClickHouseConfig;
use crate::error::Result;
use crate::models::{Event, EventAction};

/// Downstream sink for validated events
///
/// Each call applies exactly one event. Calls are not idempotent: replaying an
/// event counts it twice.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn apply_event(&self, event: &Event) -> Result<()>;
}

/// One additive row in the product activity table
///
/// The table is a SummingMergeTree keyed on the dimension columns, so every
/// insert acts as an increment of the counter columns.
#[derive(Debug, Clone, PartialEq, Row, Serialize)]
pub struct ProductActivityRow {
    pub product_id: String,
    pub shop_id: String,
    pub user_id: String,
    pub action: String,
    pub country: String,
    pub city: String,
    pub device: String,
    pub views: i32,
    pub cart_adds: i32,
    pub wishlist_adds: i32,
    pub checkouts: i32,
    pub purchases: i32,
    /// Unix seconds, stored as DateTime
    pub occurred_at: u32,
}

impl ProductActivityRow {
    pub fn from_event(event: &Event) -> Self {
        let mut row = ProductActivityRow {
            product_id: event.product_id.clone().unwrap_or_default(),
            shop_id: event.shop_id.clone().unwrap_or_default(),
            user_id: event.user_id.clone().unwrap_or_default(),
            action: event.action.as_str().to_string(),
            country: event.country.clone().unwrap_or_default(),
            city: event.city.clone().unwrap_or_default(),
            device: event.device.clone().unwrap_or_default(),
            views: 0,
            cart_adds: 0,
            wishlist_adds: 0,
            checkouts: 0,
            purchases: 0,
            occurred_at: event.occurred_at.timestamp().clamp(0, u32::MAX as i64) as u32,
        };

        match event.action {
            EventAction::ProductView => row.views = 1,
            EventAction::AddToCart => row.cart_adds = 1,
            // Cart removal is a decrement of the running cart count
            EventAction::RemoveFromCart => row.cart_adds = -1,
            EventAction::WishlistAdd => row.wishlist_adds = 1,
            EventAction::Checkout => row.checkouts = 1,
            EventAction::Purchase => row.purchases = 1,
        }

        row
    }
}

pub struct ClickHouseAnalyticsStore {
    client: Client,
    table: String,
}

impl ClickHouseAnalyticsStore {
    pub fn new(config: &ClickHouseConfig) -> Self {
        let client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database)
            .with_user(&config.user)
            .with_password(&config.password);

        info!(
            url = %config.url,
            database = %config.database,
            table = %config.table,
            "ClickHouse analytics store initialized"
        );

        Self {
            client,
            table: config.table.clone(),
        }
    }

    /// Create the product activity table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                product_id String,
                shop_id String,
                user_id String,
                action LowCardinality(String),
                country LowCardinality(String),
                city String,
                device LowCardinality(String),
                views Int32,
                cart_adds Int32,
                wishlist_adds Int32,
                checkouts Int32,
                purchases Int32,
                occurred_at DateTime
            )
            ENGINE = SummingMergeTree((views, cart_adds, wishlist_adds, checkouts, purchases))
            PARTITION BY toYYYYMM(occurred_at)
            ORDER BY (shop_id, product_id, action, country, city, device, user_id, toStartOfHour(occurred_at))
            "#,
            table = self.table
        );

        self.client.query(&ddl).execute().await?;
        info!(table = %self.table, "Product activity table ready");
        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for ClickHouseAnalyticsStore {
    async fn apply_event(&self, event: &Event) -> Result<()> {
        let row = ProductActivityRow::from_event(event);

        let mut insert = self.client.insert::<ProductActivityRow>(&self.table)?;
        insert.write(&row).await?;
        insert.end().await?;

        debug!(
            action = %event.action,
            product_id = %row.product_id,
            "Applied event to product activity"
        );
        Ok(())
    }
}
