//! Letterboxd diary feeds: fetching, entry extraction and history diffing.

use std::collections::HashMap;
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::warn;

use crate::feed::error::FeedError;

pub mod error;
pub mod extractor;
pub mod letterboxd_platform;
pub mod sanitize;

/// Guid prefix of list items, which are not diary entries.
pub const LIST_GUID_PREFIX: &str = "letterboxd-list-";

/// Sentinel rating of an unrated entry.
pub const UNRATED: i32 = -1;

/// Static information about a feed platform.
#[derive(Clone, Debug)]
pub struct PlatformInfo {
    pub name: String,
    /// Public site root, e.g. `https://letterboxd.com`. Feeds live under
    /// `{base_url}/{username}/rss/`.
    pub base_url: String,
    /// Icon shown next to the author of a digest.
    pub icon_url: String,
}

/// Shared state of a feed platform.
#[derive(Clone, Debug)]
pub struct BasePlatform {
    pub info: PlatformInfo,
}

impl BasePlatform {
    pub fn new(info: PlatformInfo) -> Self {
        Self { info }
    }

    pub fn get_feed_url(&self, username: &str) -> String {
        format!("{}/{}/rss/", self.info.base_url.trim_end_matches('/'), username)
    }
}

/// A feed document as retrieved from the wire, before extraction.
#[derive(Clone, Debug, Default)]
pub struct RawFeed {
    /// Channel title, `Letterboxd - {display name}`.
    pub title: String,
    pub items: Vec<RawItem>,
}

/// One feed item with its `letterboxd:` extension values.
#[derive(Clone, Debug, Default)]
pub struct RawItem {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: String,
    pub description: String,
    /// Extension key (e.g. `memberRating`) to its first value.
    pub extensions: HashMap<String, String>,
}

impl RawItem {
    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }

    pub fn is_list(&self) -> bool {
        self.guid
            .as_deref()
            .is_some_and(|guid| guid.starts_with(LIST_GUID_PREFIX))
    }
}

/// A normalized diary entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    /// Stable feed guid, e.g. `letterboxd-review-123456`.
    pub id: String,
    pub url: String,
    pub title: String,
    pub year: String,
    /// Tenths of a star in `0..=100`, or [`UNRATED`].
    pub rating: i32,
    pub watched_date: Option<NaiveDate>,
    pub rewatch: bool,
    /// Poster URL on the trusted image host, or empty.
    pub poster: String,
    /// Markup-free review text, possibly empty.
    pub review: String,
    pub spoiler: bool,
}

/// A subscriber's diary, newest entry first.
#[derive(Clone, Debug, Default)]
pub struct Feed {
    pub username: String,
    pub display_name: String,
    pub icon_url: String,
    pub entries: Vec<Entry>,
}

impl Feed {
    /// Builds a feed from a raw document.
    ///
    /// List items are dropped and items that fail extraction are skipped.
    pub fn from_raw(username: &str, raw: RawFeed, icon_url: &str) -> Self {
        let entries = raw
            .items
            .iter()
            .filter(|item| !item.is_list())
            .filter_map(|item| match extractor::extract(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping item of `{username}`: {e}");
                    None
                }
            })
            .collect();

        Self {
            username: username.to_string(),
            display_name: Self::display_name_from_title(&raw.title, username),
            icon_url: icon_url.to_string(),
            entries,
        }
    }

    /// Ids of every current entry, in feed order.
    pub fn history(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Keeps at most `limit` entries whose id is not in `history`.
    ///
    /// Feed order (newest first) is preserved.
    pub fn filter_entries(&self, history: &[String], limit: usize) -> Feed {
        let seen: HashSet<&str> = history.iter().map(String::as_str).collect();
        let entries = self
            .entries
            .iter()
            .filter(|e| !seen.contains(e.id.as_str()))
            .take(limit)
            .cloned()
            .collect();

        Feed {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            icon_url: self.icon_url.clone(),
            entries,
        }
    }

    /// `Letterboxd - Name` -> `Name`. Falls back to the username.
    fn display_name_from_title(title: &str, username: &str) -> String {
        let name = title.strip_prefix("Letterboxd - ").unwrap_or(title).trim();
        if name.is_empty() {
            username.to_string()
        } else {
            name.to_string()
        }
    }
}

/// A source of diary feeds.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Fetches and parses the feed document of `username`.
    async fn fetch_raw(&self, username: &str) -> Result<RawFeed, FeedError>;

    fn get_base(&self) -> &BasePlatform;

    /// Fetches the feed of `username` and extracts its entries.
    async fn fetch_feed(&self, username: &str) -> Result<Feed, FeedError> {
        let raw = self.fetch_raw(username).await?;
        Ok(Feed::from_raw(username, raw, &self.get_base().info.icon_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> Entry {
        Entry {
            id: id.to_string(),
            rating: UNRATED,
            ..Default::default()
        }
    }

    fn feed(ids: &[&str]) -> Feed {
        Feed {
            username: "fizz".to_string(),
            entries: ids.iter().map(|id| entry(id)).collect(),
            ..Default::default()
        }
    }

    fn ids(feed: &Feed) -> Vec<&str> {
        feed.entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_filter_skips_history_and_keeps_order() {
        let feed = feed(&["e5", "e4", "e3", "e2", "e1"]);
        let history = vec!["e4".to_string(), "e2".to_string()];

        let filtered = feed.filter_entries(&history, 10);
        assert_eq!(ids(&filtered), vec!["e5", "e3", "e1"]);
    }

    #[test]
    fn test_filter_caps_at_limit() {
        let feed = feed(&["e6", "e5", "e4", "e3", "e2", "e1"]);

        let filtered = feed.filter_entries(&[], 4);
        assert_eq!(ids(&filtered), vec!["e6", "e5", "e4", "e3"]);
    }

    #[test]
    fn test_filter_is_empty_at_steady_state() {
        let feed = feed(&["e3", "e2", "e1"]);
        let history = feed.history();

        assert!(feed.filter_entries(&history, 4).entries.is_empty());
    }

    #[test]
    fn test_display_name_from_title() {
        assert_eq!(
            Feed::display_name_from_title("Letterboxd - Fizz Buzz", "fizz"),
            "Fizz Buzz"
        );
        assert_eq!(Feed::display_name_from_title("", "fizz"), "fizz");
    }

    #[test]
    fn test_from_raw_drops_lists_and_broken_items() {
        let raw = RawFeed {
            title: "Letterboxd - Fizz".to_string(),
            items: vec![
                RawItem {
                    guid: Some("letterboxd-review-1".to_string()),
                    ..Default::default()
                },
                RawItem {
                    guid: Some("letterboxd-list-2".to_string()),
                    ..Default::default()
                },
                RawItem {
                    guid: None,
                    ..Default::default()
                },
            ],
        };

        let feed = Feed::from_raw("fizz", raw, "icon");
        assert_eq!(ids(&feed), vec!["letterboxd-review-1"]);
        assert_eq!(feed.display_name, "Fizz");
        assert_eq!(feed.icon_url, "icon");
    }
}
