//! Posts digests as embeds to Discord text channels over the REST API.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::info;
use serde::Serialize;
use wreq::header::AUTHORIZATION;
use wreq::header::CONTENT_TYPE;

use crate::delivery::Delivery;
use crate::delivery::DeliveryError;
use crate::digest::DigestPayload;

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    author: EmbedAuthor<'a>,
    color: u32,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<EmbedThumbnail<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedAuthor<'a> {
    name: &'a str,
    url: &'a str,
    icon_url: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedThumbnail<'a> {
    url: &'a str,
}

impl<'a> From<&'a DigestPayload> for CreateMessage<'a> {
    fn from(p: &'a DigestPayload) -> Self {
        let thumbnail = (!p.thumbnail_url.is_empty()).then_some(EmbedThumbnail {
            url: &p.thumbnail_url,
        });
        Self {
            embeds: [Embed {
                author: EmbedAuthor {
                    name: &p.author_name,
                    url: &p.author_url,
                    icon_url: &p.author_icon_url,
                },
                color: p.color,
                description: &p.description,
                thumbnail,
            }],
        }
    }
}

/// Delivers to the channel whose snowflake id is the destination key.
pub struct DiscordChannelDelivery {
    client: wreq::Client,
    api_url: String,
    token: String,
    timeout: Duration,
}

impl DiscordChannelDelivery {
    /// Every delivery, including reading a rejection body, must finish
    /// within `timeout`.
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Self {
        debug!("Initializing DiscordChannelDelivery.");
        Self {
            client: wreq::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
        }
    }

    fn message_url(&self, channel_id: u64) -> String {
        format!("{}/channels/{channel_id}/messages", self.api_url)
    }

    async fn post_message(
        &self,
        destination: &str,
        channel_id: u64,
        body: String,
    ) -> Result<(), DeliveryError> {
        let req = self
            .client
            .post(self.message_url(channel_id))
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()?;
        debug!("Making request to: {}", req.url());
        let resp = self.client.execute(req).await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                destination: destination.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Delivery for DiscordChannelDelivery {
    async fn deliver(
        &self,
        destination: &str,
        payload: &DigestPayload,
    ) -> Result<(), DeliveryError> {
        let channel_id = destination
            .parse::<u64>()
            .map_err(|_| DeliveryError::InvalidDestination {
                destination: destination.to_string(),
            })?;

        let body = serde_json::to_string(&CreateMessage::from(payload)).map_err(|e| {
            DeliveryError::RequestFailed(Box::new(e))
        })?;

        tokio::time::timeout(
            self.timeout,
            self.post_message(destination, channel_id, body),
        )
        .await
        .map_err(|_| DeliveryError::Timeout {
            destination: destination.to_string(),
            secs: self.timeout.as_secs(),
        })??;

        info!(
            "Delivered digest of {} to channel {channel_id}.",
            payload.author_name
        );
        Ok(())
    }
}
