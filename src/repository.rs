//! Database module with SQLite storage and SQLx.

use std::str::FromStr;

use log::debug;
use log::info;
use sqlx::SqlitePool;
use sqlx::Sqlite;
use sqlx::Transaction;
use sqlx::sqlite::SqliteConnectOptions;

use crate::repository::error::DatabaseError;
use crate::repository::table::DestinationGroupTable;
use crate::repository::table::DestinationTable;
use crate::repository::table::SubscriberTable;
use crate::repository::table::SubscriptionTable;
use crate::repository::table::TableBase;

pub mod error;
pub mod table;

/// Main database struct containing all table handlers.
pub struct Repository {
    pool: SqlitePool,
    pub subscriber: SubscriberTable,
    pub destination_group: DestinationGroupTable,
    pub destination: DestinationTable,
    pub subscription: SubscriptionTable,
}

impl Repository {
    /// Creates a new database connection and initializes table handlers.
    pub async fn new(db_url: &str, db_path: &str) -> Result<Self, DatabaseError> {
        let path = std::path::Path::new(db_path);
        if !path.exists() {
            debug!("Database path {db_path} does not exist. Creating...");
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "")?;
            info!("Created {db_path}");
        }

        debug!("Connecting to db...");
        let opts = SqliteConnectOptions::from_str(db_url)?.foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;
        info!("Connected to db.");

        Ok(Self::from_pool(pool))
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            subscriber: SubscriberTable::new(pool.clone()),
            destination_group: DestinationGroupTable::new(pool.clone()),
            destination: DestinationTable::new(pool.clone()),
            subscription: SubscriptionTable::new(pool.clone()),
            pool,
        }
    }

    /// Runs database migrations from the migrations directory.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Starts a transaction. Dropping it without commit rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, DatabaseError> {
        Ok(self.pool.begin().await?)
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Deletes all data from all tables, children first. Use with caution!
    pub async fn delete_all_tables(&self) -> Result<(), DatabaseError> {
        self.subscription.delete_all().await?;
        self.subscriber.delete_all().await?;
        self.destination.delete_all().await?;
        self.destination_group.delete_all().await?;
        Ok(())
    }
}
