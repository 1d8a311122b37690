//! Follow relationships between Letterboxd members and Discord channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use log::info;
use tokio::sync::RwLock;

use crate::entity::SubscriptionHistory;
use crate::repository::Repository;
use crate::repository::error::DatabaseError;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

/// Service for managing subscriptions and their delivery history.
///
/// Every mutation runs in one transaction and holds the write side of a
/// process-local lock, so concurrent follow/unfollow commands and the
/// polling cycle never interleave their writes.
pub struct SubscriptionService {
    pub repo: Arc<Repository>,
    lock: RwLock<()>,
}

impl SubscriptionService {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            lock: RwLock::new(()),
        }
    }

    /// Subscriber names are case-insensitive and stored lower-cased.
    pub fn normalize_subscriber(subscriber: &str) -> String {
        subscriber.trim().to_lowercase()
    }

    /// Follows `subscriber` in `destination`, registering the subscriber,
    /// the group and the destination when they are new.
    pub async fn subscribe(
        &self,
        subscriber: &str,
        destination: &str,
        group: &str,
    ) -> Result<(), ServiceError> {
        let subscriber = Self::normalize_subscriber(subscriber);
        let _guard = self.lock.write().await;
        let mut tx = self.repo.begin().await?;

        let subscriber_id = self
            .repo
            .subscriber
            .insert_or_ignore(&mut tx, &subscriber)
            .await?;
        let group_id = self
            .repo
            .destination_group
            .insert_or_ignore(&mut tx, group)
            .await?;
        let destination_id = self
            .repo
            .destination
            .insert_or_ignore(&mut tx, destination, group_id)
            .await?;

        // The UNIQUE constraint on the pair decides, not a prior lookup.
        match self
            .repo
            .subscription
            .insert(&mut tx, subscriber_id, destination_id)
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                return Err(ServiceError::Conflict {
                    subscriber,
                    destination: destination.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        info!("Subscribed `{subscriber}` in destination {destination} (group {group}).");
        Ok(())
    }

    /// Unfollows `subscriber` in `destination` and removes whatever the
    /// subscription leaves orphaned: the destination, its group once empty,
    /// and the subscriber.
    ///
    /// Returns the number of removed subscriptions; `0` means the pair was
    /// not followed.
    pub async fn unsubscribe(
        &self,
        subscriber: &str,
        destination: &str,
    ) -> Result<u64, ServiceError> {
        let subscriber = Self::normalize_subscriber(subscriber);
        let _guard = self.lock.write().await;
        let mut tx = self.repo.begin().await?;

        let Some(subscription) = self
            .repo
            .subscription
            .select_by_names(&mut tx, &subscriber, destination)
            .await?
        else {
            debug!("Nothing to unsubscribe for `{subscriber}` in {destination}.");
            return Ok(0);
        };

        let group_id = self
            .repo
            .destination
            .select_group_id(&mut tx, subscription.destination_id)
            .await?;

        let removed = self
            .repo
            .subscription
            .delete_by_id(&mut tx, subscription.id)
            .await?;

        let destination_removed = self
            .repo
            .destination
            .delete_if_unreferenced(&mut tx, subscription.destination_id)
            .await?;
        if destination_removed > 0
            && let Some(group_id) = group_id
        {
            self.repo
                .destination_group
                .delete_if_unreferenced(&mut tx, group_id)
                .await?;
        }
        self.repo
            .subscriber
            .delete_if_unreferenced(&mut tx, subscription.subscriber_id)
            .await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        info!("Unsubscribed `{subscriber}` from destination {destination}.");
        Ok(removed)
    }

    /// Like [`Self::unsubscribe`], but a missing pair is an error.
    pub async fn unsubscribe_strict(
        &self,
        subscriber: &str,
        destination: &str,
    ) -> Result<(), ServiceError> {
        match self.unsubscribe(subscriber, destination).await? {
            0 => Err(ServiceError::NotFound {
                subscriber: Self::normalize_subscriber(subscriber),
                destination: destination.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub async fn exists(&self, subscriber: &str, destination: &str) -> Result<bool, ServiceError> {
        let subscriber = Self::normalize_subscriber(subscriber);
        let _guard = self.lock.read().await;
        Ok(self
            .repo
            .subscription
            .exists_by_names(&subscriber, destination)
            .await?)
    }

    /// Names followed in `destination`, sorted alphabetically.
    pub async fn list_subscribers(&self, destination: &str) -> Result<Vec<String>, ServiceError> {
        let _guard = self.lock.read().await;
        Ok(self
            .repo
            .subscription
            .select_subscriber_names_by_destination(destination)
            .await?)
    }

    /// Every subscription, grouped by subscriber name.
    pub async fn list_all_subscriptions_by_subscriber(
        &self,
    ) -> Result<BTreeMap<String, Vec<SubscriptionHistory>>, ServiceError> {
        let _guard = self.lock.read().await;
        let rows = self.repo.subscription.select_all_rows().await?;

        let mut grouped: BTreeMap<String, Vec<SubscriptionHistory>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.subscriber.clone())
                .or_default()
                .push(row.into());
        }
        Ok(grouped)
    }

    /// Replaces the stored history of the pair.
    pub async fn update_history(
        &self,
        subscriber: &str,
        destination: &str,
        history: Vec<String>,
    ) -> Result<(), ServiceError> {
        let subscriber = Self::normalize_subscriber(subscriber);
        let _guard = self.lock.write().await;
        let mut tx = self.repo.begin().await?;

        let updated = self
            .repo
            .subscription
            .update_history(&mut tx, &subscriber, destination, history)
            .await?;
        if updated == 0 {
            return Err(ServiceError::NotFound {
                subscriber,
                destination: destination.to_string(),
            });
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Number of stored subscriptions.
    pub async fn count(&self) -> Result<i64, ServiceError> {
        let _guard = self.lock.read().await;
        Ok(self.repo.subscription.count().await?)
    }
}
