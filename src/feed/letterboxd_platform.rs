//! Letterboxd diary RSS platform.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use log::info;
use rss::Channel;
use rss::Item;

use crate::feed::BasePlatform;
use crate::feed::Platform;
use crate::feed::PlatformInfo;
use crate::feed::RawFeed;
use crate::feed::RawItem;
use crate::feed::error::FeedError;

/// Namespace prefix of the Letterboxd item extensions.
const EXTENSION_NAMESPACE: &str = "letterboxd";

// Letterboxd publishes no rate limit for RSS; stay polite.
const REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::new(2).unwrap();

pub const DEFAULT_BASE_URL: &str = "https://letterboxd.com";

pub const ICON_URL: &str =
    "https://cdn.discordapp.com/attachments/530814994204590097/794205173358395422/image0.png";

/// Fetches diary feeds from `{base_url}/{username}/rss/`.
pub struct LetterboxdPlatform {
    pub base: BasePlatform,
    client: wreq::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
    timeout: Duration,
}

impl LetterboxdPlatform {
    /// Creates a platform rooted at `base_url`. Each fetch, body included,
    /// must finish within `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let info = PlatformInfo {
            name: "Letterboxd".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            icon_url: ICON_URL.to_string(),
        };
        let limiter = RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND));
        let client = wreq::Client::builder()
            .emulation(wreq_util::Emulation::Chrome137)
            .build()?;

        Ok(Self {
            base: BasePlatform::new(info),
            client,
            limiter,
            timeout,
        })
    }

    async fn send(&self, request: wreq::RequestBuilder) -> Result<wreq::Response, wreq::Error> {
        if self.limiter.check().is_err() {
            info!("Source {} is ratelimited. Waiting...", self.base.info.name);
        }
        self.limiter.until_ready().await;

        let req = request.build()?;
        debug!("Making request to: {}", req.url());
        self.client.execute(req).await
    }

    async fn fetch_document(&self, url: &str) -> Result<String, FeedError> {
        let resp = self.send(self.client.get(url)).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }

    /// Parses an RSS document into a [`RawFeed`].
    pub fn parse_document(body: &str) -> Result<RawFeed, FeedError> {
        let channel = Channel::read_from(body.as_bytes())?;
        Ok(RawFeed {
            title: channel.title().to_string(),
            items: channel.items().iter().map(Self::raw_item).collect(),
        })
    }

    fn raw_item(item: &Item) -> RawItem {
        let extensions: HashMap<String, String> = item
            .extensions()
            .get(EXTENSION_NAMESPACE)
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|(key, values)| {
                        let value = values.first()?.value()?;
                        Some((key.clone(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        RawItem {
            guid: item.guid().map(|g| g.value().to_string()),
            link: item.link().map(str::to_string),
            title: item.title().unwrap_or_default().to_string(),
            description: item.description().unwrap_or_default().to_string(),
            extensions,
        }
    }
}

#[async_trait]
impl Platform for LetterboxdPlatform {
    async fn fetch_raw(&self, username: &str) -> Result<RawFeed, FeedError> {
        let url = self.base.get_feed_url(username);

        let body = tokio::time::timeout(self.timeout, self.fetch_document(&url))
            .await
            .map_err(|_| FeedError::Timeout {
                url: url.clone(),
                secs: self.timeout.as_secs(),
            })??;

        Self::parse_document(&body)
    }

    fn get_base(&self) -> &BasePlatform {
        &self.base
    }
}
