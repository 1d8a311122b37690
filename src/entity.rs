use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;

/// A Letterboxd member whose diary is followed.
///
/// Rows only exist while at least one [`SubscriptionEntity`] references
/// them. The name is always stored lower-cased.
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct SubscriberEntity {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A collection of destinations sharing an administrative scope (a Discord
/// guild).
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct DestinationGroupEntity {
    #[serde(default)]
    pub id: i64,
    /// Discord snowflake ID of the guild
    #[serde(default)]
    pub group_key: String,
}

/// A delivery target (a Discord channel).
///
/// Belongs to exactly one [`DestinationGroupEntity`].
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct DestinationEntity {
    #[serde(default)]
    pub id: i64,
    /// Discord snowflake ID of the channel
    #[serde(default)]
    pub destination_key: String,
    #[serde(default)]
    pub group_id: i64,
}

/// Links a subscriber to a destination.
///
/// Junction table between subscribers and destinations. `history` holds the
/// ids of the diary entries already delivered (or seen and suppressed) for
/// this pair, newest first.
#[derive(FromRow, Serialize, Default, Clone, Debug)]
pub struct SubscriptionEntity {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub subscriber_id: i64,
    #[serde(default)]
    pub destination_id: i64,
    #[serde(default)]
    pub history: Json<Vec<String>>,
}

/// Subscription joined with the names it links, used by the polling cycle.
#[derive(FromRow, Clone, Debug)]
pub struct SubscriptionRow {
    pub subscriber: String,
    pub destination: String,
    pub history: Json<Vec<String>>,
}

/// One subscription of a subscriber, as seen by the polling cycle.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionHistory {
    pub destination: String,
    pub history: Vec<String>,
}

impl From<SubscriptionRow> for SubscriptionHistory {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            destination: row.destination,
            history: row.history.0,
        }
    }
}
