//! Business logic services for subscriptions and the diary polling cycle.

use std::sync::Arc;

use crate::delivery::Delivery;
use crate::feed::Platform;
use crate::repository::Repository;
use crate::service::diary_feed_service::DiaryFeedService;
use crate::service::subscription_service::SubscriptionService;

pub mod diary_feed_service;
pub mod error;
pub mod subscription_service;

/// Container for all application services.
pub struct Services {
    pub subscription: Arc<SubscriptionService>,
    pub diary_feed: Arc<DiaryFeedService>,
}

impl Services {
    pub fn new(
        repo: Arc<Repository>,
        platform: Arc<dyn Platform>,
        delivery: Arc<dyn Delivery>,
        entry_limit: usize,
    ) -> Self {
        let subscription = Arc::new(SubscriptionService::new(repo));
        let diary_feed = Arc::new(DiaryFeedService::new(
            subscription.clone(),
            platform,
            delivery,
            entry_limit,
        ));

        Self {
            subscription,
            diary_feed,
        }
    }
}
