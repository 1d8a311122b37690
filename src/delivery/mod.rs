//! Delivery of rendered digests to their destinations.

use async_trait::async_trait;

use crate::digest::DigestPayload;

pub mod discord_channel_delivery;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Delivery to `{destination}` was rejected with status {status}: {body}")]
    Rejected {
        destination: String,
        status: u16,
        body: String,
    },

    #[error("Delivery to `{destination}` timed out after {secs}s")]
    Timeout { destination: String, secs: u64 },

    #[error("Invalid destination `{destination}`.")]
    InvalidDestination { destination: String },
}

impl From<wreq::Error> for DeliveryError {
    fn from(e: wreq::Error) -> Self {
        DeliveryError::RequestFailed(Box::new(e))
    }
}

/// Sends a digest to one destination.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, destination: &str, payload: &DigestPayload)
    -> Result<(), DeliveryError>;
}
