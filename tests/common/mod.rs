use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use fizzboxd::delivery::Delivery;
use fizzboxd::delivery::DeliveryError;
use fizzboxd::digest::DigestPayload;
use fizzboxd::feed::BasePlatform;
use fizzboxd::feed::Platform;
use fizzboxd::feed::PlatformInfo;
use fizzboxd::feed::RawFeed;
use fizzboxd::feed::RawItem;
use fizzboxd::feed::error::FeedError;
use fizzboxd::repository::Repository;
use uuid::Uuid;

pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("fizzboxd-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let repo = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    (Arc::new(repo), db_path)
}

pub async fn teardown_db(repo: Arc<Repository>, db_path: PathBuf) {
    repo.close().await;
    if db_path.exists() {
        let _ = std::fs::remove_file(db_path);
    }
}

/// Raw feed whose items carry only the given guids, newest first.
#[allow(dead_code)]
pub fn raw_feed(display_name: &str, guids: &[&str]) -> RawFeed {
    RawFeed {
        title: format!("Letterboxd - {display_name}"),
        items: guids
            .iter()
            .map(|guid| RawItem {
                guid: Some(guid.to_string()),
                link: Some(format!("https://letterboxd.com/film/{guid}/")),
                title: format!("{guid}, 2000"),
                description: format!(" <p>review of {guid}</p> "),
                extensions: HashMap::from([
                    ("filmTitle".to_string(), guid.to_string()),
                    ("filmYear".to_string(), "2000".to_string()),
                    ("memberRating".to_string(), "3.5".to_string()),
                ]),
            })
            .collect(),
    }
}

// MOCK PLATFORM

#[derive(Clone)]
#[allow(dead_code)]
pub struct MockPlatform {
    pub base: BasePlatform,
    pub state: Arc<RwLock<MockPlatformState>>,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MockPlatformState {
    pub feeds: HashMap<String, RawFeed>,
    pub fetches: HashMap<String, usize>,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        let info = PlatformInfo {
            name: "MockPlatform".to_string(),
            base_url: "https://letterboxd.example".to_string(),
            icon_url: "https://icon.example/icon.png".to_string(),
        };
        Self {
            base: BasePlatform::new(info),
            state: Arc::new(RwLock::new(MockPlatformState::default())),
        }
    }

    pub fn set_feed(&self, username: &str, feed: RawFeed) {
        self.state
            .write()
            .unwrap()
            .feeds
            .insert(username.to_string(), feed);
    }

    pub fn remove_feed(&self, username: &str) {
        self.state.write().unwrap().feeds.remove(username);
    }

    pub fn fetch_count(&self, username: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .fetches
            .get(username)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn fetch_raw(&self, username: &str) -> Result<RawFeed, FeedError> {
        let mut state = self.state.write().unwrap();
        *state.fetches.entry(username.to_string()).or_default() += 1;
        state
            .feeds
            .get(username)
            .cloned()
            .ok_or_else(|| FeedError::HttpStatus {
                url: self.base.get_feed_url(username),
                status: 404,
            })
    }

    fn get_base(&self) -> &BasePlatform {
        &self.base
    }
}

// MOCK DELIVERY

#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockDelivery {
    pub state: Arc<RwLock<MockDeliveryState>>,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MockDeliveryState {
    pub delivered: Vec<(String, DigestPayload)>,
    pub failing: HashSet<String>,
}

#[allow(dead_code)]
impl MockDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, destination: &str) {
        self.state
            .write()
            .unwrap()
            .failing
            .insert(destination.to_string());
    }

    pub fn recover(&self, destination: &str) {
        self.state.write().unwrap().failing.remove(destination);
    }

    pub fn delivered(&self) -> Vec<(String, DigestPayload)> {
        self.state.read().unwrap().delivered.clone()
    }
}

#[async_trait]
impl Delivery for MockDelivery {
    async fn deliver(
        &self,
        destination: &str,
        payload: &DigestPayload,
    ) -> Result<(), DeliveryError> {
        let mut state = self.state.write().unwrap();
        if state.failing.contains(destination) {
            return Err(DeliveryError::Rejected {
                destination: destination.to_string(),
                status: 500,
                body: "mock failure".to_string(),
            });
        }
        state
            .delivered
            .push((destination.to_string(), payload.clone()));
        Ok(())
    }
}
