use crate::delivery::DeliveryError;
use crate::feed::error::FeedError;
use crate::repository::error::DatabaseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("`{subscriber}` is already followed in `{destination}`.")]
    Conflict {
        subscriber: String,
        destination: String,
    },

    #[error("`{subscriber}` is not followed in `{destination}`.")]
    NotFound {
        subscriber: String,
        destination: String,
    },

    #[error("FeedError: {0}")]
    FeedError(#[from] FeedError),

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("DeliveryError: {0}")]
    DeliveryError(#[from] DeliveryError),
}
