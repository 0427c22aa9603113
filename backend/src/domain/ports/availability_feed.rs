//! Driven port for the live lot availability feed.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::AvailabilityRecord;

/// Decoded feed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityBatch {
    /// Valid records in payload order; duplicates are not yet collapsed.
    pub records: Vec<AvailabilityRecord>,
    /// Records in the payload that failed validation.
    pub rejected: usize,
}

impl AvailabilityBatch {
    /// Number of records present in the payload, valid or not.
    pub fn received(&self) -> usize {
        self.records.len() + self.rejected
    }
}

define_port_error! {
    /// Errors raised while fetching the feed.
    pub enum AvailabilityFeedError {
        /// Network transport failed before a response arrived.
        Transport { message: String } => "availability transport failed: {message}",
        /// The request exceeded the client timeout.
        Timeout { message: String } => "availability request timed out: {message}",
        /// The feed answered with a non-success status.
        Status { status: u16 } => "availability feed returned status {status}",
        /// The payload could not be decoded.
        Decode { message: String } => "availability payload decode failed: {message}",
        /// The request could not be built.
        InvalidRequest { message: String } => "availability request invalid: {message}",
    }
}

impl AvailabilityFeedError {
    /// Whether retrying on a later tick is expected to help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status } => *status == 429 || *status >= 500,
            Self::Decode { .. } | Self::InvalidRequest { .. } => false,
        }
    }
}

/// Port fetching the current availability snapshot from upstream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityFeed: Send + Sync {
    async fn fetch_availability(&self) -> Result<AvailabilityBatch, AvailabilityFeedError>;
}

/// Fixture feed returning no records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureAvailabilityFeed;

#[async_trait]
impl AvailabilityFeed for FixtureAvailabilityFeed {
    async fn fetch_availability(&self) -> Result<AvailabilityBatch, AvailabilityFeedError> {
        Ok(AvailabilityBatch::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AvailabilityFeedError::transport("reset"), true)]
    #[case(AvailabilityFeedError::timeout("15s"), true)]
    #[case(AvailabilityFeedError::status(503_u16), true)]
    #[case(AvailabilityFeedError::status(429_u16), true)]
    #[case(AvailabilityFeedError::status(404_u16), false)]
    #[case(AvailabilityFeedError::decode("missing items"), false)]
    #[case(AvailabilityFeedError::invalid_request("bad url"), false)]
    fn retryability_follows_error_kind(
        #[case] error: AvailabilityFeedError,
        #[case] expected: bool,
    ) {
        assert_eq!(error.is_retryable(), expected);
    }
}
