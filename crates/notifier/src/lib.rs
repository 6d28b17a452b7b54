//! # Notifier
//!
//! Subscription lifecycle, matching of freshly persisted chains against active subscriptions,
//! and delivery of rendered messages to chat channels.

pub mod dispatcher;
pub mod errors;
pub mod matcher;
pub mod render;
pub mod service;
pub mod telegram;

pub use dispatcher::{ChatDispatcher, Dispatch, DispatcherSettings, SendJob};
pub use errors::SubscriptionError;
pub use service::SubscriptionService;
pub use telegram::{TelegramChannel, TelegramError};
