//! Database table operations and implementations.
//!
//! Reads run against the shared pool. Writes take an explicit
//! `&mut SqliteConnection` so callers can group them in one transaction.

use sqlx::SqliteConnection;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::entity::DestinationEntity;
use crate::entity::DestinationGroupEntity;
use crate::entity::SubscriberEntity;
use crate::entity::SubscriptionEntity;
use crate::entity::SubscriptionRow;
use crate::repository::error::DatabaseError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Trait for tables with read operations keyed by an integer primary key.
#[async_trait::async_trait]
pub trait Table<T>: TableBase {
    async fn select_all(&self) -> Result<Vec<T>, DatabaseError>;
    async fn select(&self, id: i64) -> Result<Option<T>, DatabaseError>;
    async fn count(&self) -> Result<i64, DatabaseError>;
}

macro_rules! impl_table {
    ($struct_name:ident, $model:ty, $table:expr) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: SqlitePool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn delete_all(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DELETE FROM ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }
        }

        #[async_trait::async_trait]
        impl Table<$model> for $struct_name {
            async fn select_all(&self) -> Result<Vec<$model>, DatabaseError> {
                Ok(
                    sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table, " ORDER BY id"))
                        .fetch_all(&self.base.pool)
                        .await?,
                )
            }

            async fn select(&self, id: i64) -> Result<Option<$model>, DatabaseError> {
                Ok(
                    sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table, " WHERE id = ?"))
                        .bind(id)
                        .fetch_optional(&self.base.pool)
                        .await?,
                )
            }

            async fn count(&self) -> Result<i64, DatabaseError> {
                let count: (i64,) = sqlx::query_as(concat!("SELECT COUNT(*) FROM ", $table))
                    .fetch_one(&self.base.pool)
                    .await?;
                Ok(count.0)
            }
        }
    };
}

// ============================================================================
// SubscriberTable
// ============================================================================

impl_table!(SubscriberTable, SubscriberEntity, "subscribers");

impl SubscriberTable {
    /// Inserts the subscriber unless it exists and returns its id either way.
    pub async fn insert_or_ignore(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<i64, DatabaseError> {
        sqlx::query("INSERT INTO subscribers (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        let row: (i64,) = sqlx::query_as("SELECT id FROM subscribers WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }

    pub async fn select_by_name(&self, name: &str) -> Result<Option<SubscriberEntity>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, SubscriberEntity>("SELECT * FROM subscribers WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.base.pool)
                .await?,
        )
    }

    /// Deletes the subscriber if no subscription references it anymore.
    pub async fn delete_if_unreferenced(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            DELETE FROM subscribers
            WHERE id = ?
                AND NOT EXISTS (
                    SELECT 1 FROM subscriptions WHERE subscriber_id = subscribers.id
                )
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// DestinationGroupTable
// ============================================================================

impl_table!(
    DestinationGroupTable,
    DestinationGroupEntity,
    "destination_groups"
);

impl DestinationGroupTable {
    /// Inserts the group unless it exists and returns its id either way.
    pub async fn insert_or_ignore(
        &self,
        conn: &mut SqliteConnection,
        group_key: &str,
    ) -> Result<i64, DatabaseError> {
        sqlx::query(
            "INSERT INTO destination_groups (group_key) VALUES (?) ON CONFLICT(group_key) DO NOTHING",
        )
        .bind(group_key)
        .execute(&mut *conn)
        .await?;
        let row: (i64,) = sqlx::query_as("SELECT id FROM destination_groups WHERE group_key = ?")
            .bind(group_key)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }

    pub async fn select_by_key(
        &self,
        group_key: &str,
    ) -> Result<Option<DestinationGroupEntity>, DatabaseError> {
        Ok(sqlx::query_as::<_, DestinationGroupEntity>(
            "SELECT * FROM destination_groups WHERE group_key = ?",
        )
        .bind(group_key)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    /// Deletes the group if it has no destinations left.
    pub async fn delete_if_unreferenced(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            DELETE FROM destination_groups
            WHERE id = ?
                AND NOT EXISTS (
                    SELECT 1 FROM destinations WHERE group_id = destination_groups.id
                )
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// DestinationTable
// ============================================================================

impl_table!(DestinationTable, DestinationEntity, "destinations");

impl DestinationTable {
    /// Inserts the destination under `group_id` unless it exists and returns
    /// its id either way. An existing destination keeps its original group.
    pub async fn insert_or_ignore(
        &self,
        conn: &mut SqliteConnection,
        destination_key: &str,
        group_id: i64,
    ) -> Result<i64, DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO destinations (destination_key, group_id) VALUES (?, ?)
            ON CONFLICT(destination_key) DO NOTHING
            "#,
        )
        .bind(destination_key)
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
        let row: (i64,) = sqlx::query_as("SELECT id FROM destinations WHERE destination_key = ?")
            .bind(destination_key)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }

    pub async fn select_by_key(
        &self,
        destination_key: &str,
    ) -> Result<Option<DestinationEntity>, DatabaseError> {
        Ok(sqlx::query_as::<_, DestinationEntity>(
            "SELECT * FROM destinations WHERE destination_key = ?",
        )
        .bind(destination_key)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    pub async fn select_group_id(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<i64>, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT group_id FROM destinations WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| r.0))
    }

    /// Deletes the destination if no subscription references it anymore.
    pub async fn delete_if_unreferenced(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            DELETE FROM destinations
            WHERE id = ?
                AND NOT EXISTS (
                    SELECT 1 FROM subscriptions WHERE destination_id = destinations.id
                )
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// SubscriptionTable
// ============================================================================

impl_table!(SubscriptionTable, SubscriptionEntity, "subscriptions");

impl SubscriptionTable {
    /// Inserts a subscription with an empty history.
    ///
    /// Fails with a UNIQUE violation if the pair already exists.
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        subscriber_id: i64,
        destination_id: i64,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO subscriptions (subscriber_id, destination_id, history)
            VALUES (?, ?, '[]')
            RETURNING id
            "#,
        )
        .bind(subscriber_id)
        .bind(destination_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.0)
    }

    pub async fn select_by_names(
        &self,
        conn: &mut SqliteConnection,
        subscriber: &str,
        destination: &str,
    ) -> Result<Option<SubscriptionEntity>, DatabaseError> {
        Ok(sqlx::query_as::<_, SubscriptionEntity>(
            r#"
            SELECT s.id, s.subscriber_id, s.destination_id, s.history
            FROM subscriptions s
            JOIN subscribers u ON s.subscriber_id = u.id
            JOIN destinations d ON s.destination_id = d.id
            WHERE u.name = ? AND d.destination_key = ?
            "#,
        )
        .bind(subscriber)
        .bind(destination)
        .fetch_optional(&mut *conn)
        .await?)
    }

    /// Check if a subscription exists for the pair
    pub async fn exists_by_names(
        &self,
        subscriber: &str,
        destination: &str,
    ) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM subscriptions s
            JOIN subscribers u ON s.subscriber_id = u.id
            JOIN destinations d ON s.destination_id = d.id
            WHERE u.name = ? AND d.destination_key = ?
            "#,
        )
        .bind(subscriber)
        .bind(destination)
        .fetch_one(&self.base.pool)
        .await?;
        Ok(count.0 > 0)
    }

    pub async fn delete_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Get the names of all subscribers followed in a destination, sorted.
    pub async fn select_subscriber_names_by_destination(
        &self,
        destination: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT u.name
            FROM subscriptions s
            JOIN subscribers u ON s.subscriber_id = u.id
            JOIN destinations d ON s.destination_id = d.id
            WHERE d.destination_key = ?
            ORDER BY u.name
            "#,
        )
        .bind(destination)
        .fetch_all(&self.base.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Get every subscription with its subscriber and destination names.
    pub async fn select_all_rows(&self) -> Result<Vec<SubscriptionRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT u.name AS subscriber, d.destination_key AS destination, s.history AS history
            FROM subscriptions s
            JOIN subscribers u ON s.subscriber_id = u.id
            JOIN destinations d ON s.destination_id = d.id
            ORDER BY u.name, s.id
            "#,
        )
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Replaces the history of the subscription for the pair.
    pub async fn update_history(
        &self,
        conn: &mut SqliteConnection,
        subscriber: &str,
        destination: &str,
        history: Vec<String>,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET history = ?
            WHERE subscriber_id = (SELECT id FROM subscribers WHERE name = ?)
                AND destination_id = (SELECT id FROM destinations WHERE destination_key = ?)
            "#,
        )
        .bind(Json(history))
        .bind(subscriber)
        .bind(destination)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
