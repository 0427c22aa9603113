//! Live availability feed adapters.

mod dto;
mod http_feed;

pub use http_feed::{AvailabilityHttpFeed, DEFAULT_USER_AGENT};
