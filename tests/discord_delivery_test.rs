//! Tests for the Discord channel delivery adapter using mock servers.

use std::time::Duration;

use fizzboxd::delivery::Delivery;
use fizzboxd::delivery::DeliveryError;
use fizzboxd::delivery::discord_channel_delivery::DiscordChannelDelivery;
use fizzboxd::digest::DigestPayload;
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

fn payload() -> DigestPayload {
    DigestPayload {
        author_name: "Fizz".to_string(),
        author_url: "https://letterboxd.com/fizz/films/diary/".to_string(),
        author_icon_url: "https://icon".to_string(),
        color: 0xd8b437,
        description: "**[Chinatown (1974)](https://letterboxd.com/)**\n".to_string(),
        thumbnail_url: "https://a.ltrbxd.com/resized/x.jpg".to_string(),
    }
}

#[tokio::test]
async fn test_deliver_posts_embed() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/channels/123456789/messages")
            .header("authorization", "Bot secret")
            .json_body(json!({
                "embeds": [{
                    "author": {
                        "name": "Fizz",
                        "url": "https://letterboxd.com/fizz/films/diary/",
                        "icon_url": "https://icon",
                    },
                    "color": 0xd8b437,
                    "description": "**[Chinatown (1974)](https://letterboxd.com/)**\n",
                    "thumbnail": { "url": "https://a.ltrbxd.com/resized/x.jpg" },
                }]
            }));
        then.status(200).json_body(json!({ "id": "1" }));
    });

    let delivery = DiscordChannelDelivery::new(&server.url(""), "secret", Duration::from_secs(5));
    delivery
        .deliver("123456789", &payload())
        .await
        .expect("Failed to deliver");

    mock.assert();
}

#[tokio::test]
async fn test_deliver_reports_rejection() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/channels/1/messages");
        then.status(403)
            .json_body(json!({ "message": "Missing Access", "code": 50001 }));
    });

    let delivery = DiscordChannelDelivery::new(&server.url(""), "secret", Duration::from_secs(5));
    let err = delivery.deliver("1", &payload()).await.unwrap_err();

    mock.assert();
    match err {
        DeliveryError::Rejected { status, body, .. } => {
            assert_eq!(status, 403);
            assert!(body.contains("Missing Access"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_deliver_times_out_on_stalled_server() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/channels/1/messages");
        then.status(200)
            .delay(Duration::from_secs(3))
            .json_body(json!({ "id": "1" }));
    });

    let delivery =
        DiscordChannelDelivery::new(&server.url(""), "secret", Duration::from_millis(500));
    let err = delivery.deliver("1", &payload()).await.unwrap_err();

    assert!(
        matches!(err, DeliveryError::Timeout { ref destination, .. } if destination == "1"),
        "unexpected error: {err}"
    );
}
