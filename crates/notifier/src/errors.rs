use thiserror::Error;

/// Failures of subscription validation and lifecycle calls.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("subscription id is empty")]
    IdEmpty,

    #[error("subscription not found: {0}")]
    NotFound(String),

    #[error("subscription is not active: {0}")]
    NotActive(String),

    #[error("min profit must be within [0.0001, 99.9999] percent")]
    MinProfitInvalid,

    #[error("max depth must be at least 2")]
    MaxDepthInvalid,

    #[error("notification channel is not supported: {0}")]
    ChannelNotSupported(String),

    #[error("telegram notification requires a non-zero channel")]
    ChatChannelInvalid,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
