//! One polling cycle over every followed diary.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use log::debug;
use log::error;
use log::info;
use log::warn;
use tracing::Instrument;
use tracing::info_span;

use crate::delivery::Delivery;
use crate::digest::DigestBuilder;
use crate::entity::SubscriptionHistory;
use crate::feed::Feed;
use crate::feed::Platform;
use crate::service::error::ServiceError;
use crate::service::subscription_service::SubscriptionService;

/// What happened to one subscription during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// No entry outside the stored history.
    NoUpdate,
    /// First sighting of the feed; history stored without delivering.
    Seeded,
    /// A digest of `entries` entries was delivered and history advanced.
    Delivered { entries: usize },
}

/// Totals of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub subscribers: usize,
    pub fetch_failures: usize,
    pub subscriptions: usize,
    pub unchanged: usize,
    pub seeded: usize,
    pub delivered: usize,
    pub failures: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &Result<SubscriptionOutcome, ServiceError>) {
        self.subscriptions += 1;
        match outcome {
            Ok(SubscriptionOutcome::NoUpdate) => self.unchanged += 1,
            Ok(SubscriptionOutcome::Seeded) => self.seeded += 1,
            Ok(SubscriptionOutcome::Delivered { .. }) => self.delivered += 1,
            Err(_) => self.failures += 1,
        }
    }

    fn merge(mut self, other: CycleReport) -> Self {
        self.subscribers += other.subscribers;
        self.fetch_failures += other.fetch_failures;
        self.subscriptions += other.subscriptions;
        self.unchanged += other.unchanged;
        self.seeded += other.seeded;
        self.delivered += other.delivered;
        self.failures += other.failures;
        self
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subscribers ({} fetch failures), {} subscriptions: {} delivered, {} seeded, {} unchanged, {} failed",
            self.subscribers,
            self.fetch_failures,
            self.subscriptions,
            self.delivered,
            self.seeded,
            self.unchanged,
            self.failures
        )
    }
}

/// Fetches followed diaries, renders what is new and delivers it.
pub struct DiaryFeedService {
    pub subscriptions: Arc<SubscriptionService>,
    pub platform: Arc<dyn Platform>,
    pub delivery: Arc<dyn Delivery>,
    pub entry_limit: usize,
}

impl DiaryFeedService {
    pub fn new(
        subscriptions: Arc<SubscriptionService>,
        platform: Arc<dyn Platform>,
        delivery: Arc<dyn Delivery>,
        entry_limit: usize,
    ) -> Self {
        Self {
            subscriptions,
            platform,
            delivery,
            entry_limit,
        }
    }

    /// Runs one cycle. Up to `concurrency` subscribers are handled at once.
    ///
    /// Only failing to list the subscriptions aborts the cycle. Fetch,
    /// delivery and persistence failures are logged and counted.
    pub async fn check_updates(&self, concurrency: usize) -> Result<CycleReport, ServiceError> {
        let grouped = self
            .subscriptions
            .list_all_subscriptions_by_subscriber()
            .await?;
        info!("Found {} followed diaries to check.", grouped.len());

        let report = stream::iter(grouped)
            .map(|(subscriber, subscriptions)| {
                let span = info_span!("diary", subscriber = %subscriber);
                async move { self.process_subscriber(&subscriber, subscriptions).await }
                    .instrument(span)
            })
            .buffer_unordered(concurrency.max(1))
            .fold(CycleReport::default(), |acc, report| async move {
                acc.merge(report)
            })
            .await;

        Ok(report)
    }

    /// Fetches the diary of `subscriber` once and applies it to each of its
    /// subscriptions.
    pub async fn process_subscriber(
        &self,
        subscriber: &str,
        subscriptions: Vec<SubscriptionHistory>,
    ) -> CycleReport {
        let mut report = CycleReport {
            subscribers: 1,
            ..Default::default()
        };

        let feed = match self.platform.fetch_feed(subscriber).await {
            Ok(feed) => feed,
            Err(e) => {
                warn!("Failed to fetch diary of `{subscriber}`: {e}");
                report.fetch_failures += 1;
                return report;
            }
        };
        debug!(
            "Fetched {} entries for `{subscriber}`.",
            feed.entries.len()
        );

        for subscription in &subscriptions {
            let outcome = self.process_subscription(&feed, subscription).await;
            match &outcome {
                Ok(SubscriptionOutcome::Delivered { entries }) => info!(
                    "Delivered {entries} entries of `{subscriber}` to {}.",
                    subscription.destination
                ),
                Ok(SubscriptionOutcome::Seeded) => info!(
                    "Seeded history of `{subscriber}` in {} without delivering.",
                    subscription.destination
                ),
                Ok(SubscriptionOutcome::NoUpdate) => {}
                Err(e) => error!(
                    "Error processing `{subscriber}` in {}: {e}",
                    subscription.destination
                ),
            }
            report.record(&outcome);
        }
        report
    }

    /// Applies an already fetched feed to one subscription.
    ///
    /// A failed delivery leaves the history untouched so the same entries
    /// are retried next cycle.
    pub async fn process_subscription(
        &self,
        feed: &Feed,
        subscription: &SubscriptionHistory,
    ) -> Result<SubscriptionOutcome, ServiceError> {
        let filtered = feed.filter_entries(&subscription.history, self.entry_limit);
        if filtered.entries.is_empty() {
            return Ok(SubscriptionOutcome::NoUpdate);
        }

        let outcome = if subscription.history.is_empty() {
            SubscriptionOutcome::Seeded
        } else {
            let payload = DigestBuilder::new(&filtered).build();
            self.delivery
                .deliver(&subscription.destination, &payload)
                .await?;
            SubscriptionOutcome::Delivered {
                entries: filtered.entries.len(),
            }
        };

        self.subscriptions
            .update_history(&feed.username, &subscription.destination, feed.history())
            .await?;
        Ok(outcome)
    }
}
