//! Live availability ingestion.
//!
//! The feed is fetched before any store work begins, so no connection or row
//! lock is held across network I/O. Known carparks get their lot data
//! overwritten in one transaction; unknown identifiers are skipped.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::Error;
use super::carpark::{AvailabilityRecord, CarparkId};
use super::ports::{AvailabilityFeed, AvailabilityFeedError, CarparkRepository};
use super::registry_loader::map_carpark_repository_error;

/// Outcome of one availability sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilitySyncReport {
    /// Records present in the payload.
    pub received: usize,
    pub updated: usize,
    /// Distinct valid identifiers with no stored carpark.
    pub skipped_unknown: usize,
    pub rejected: usize,
}

/// Collapse repeated identifiers, keeping the last record for each while
/// preserving first-seen order.
pub fn collapse_duplicates(records: Vec<AvailabilityRecord>) -> Vec<AvailabilityRecord> {
    let mut positions: HashMap<CarparkId, usize> = HashMap::with_capacity(records.len());
    let mut collapsed: Vec<AvailabilityRecord> = Vec::with_capacity(records.len());
    for record in records {
        match positions.get(&record.id) {
            Some(&position) => {
                debug!(car_park_no = %record.id, "duplicate availability record replaced");
                collapsed[position] = record;
            }
            None => {
                positions.insert(record.id.clone(), collapsed.len());
                collapsed.push(record);
            }
        }
    }
    collapsed
}

fn map_feed_error(error: AvailabilityFeedError) -> Error {
    if error.is_retryable() {
        Error::service_unavailable(error.to_string())
    } else {
        Error::internal(error.to_string())
    }
}

/// Applies the live feed to stored carparks.
#[derive(Clone)]
pub struct AvailabilitySync {
    feed: Arc<dyn AvailabilityFeed>,
    carparks: Arc<dyn CarparkRepository>,
}

impl AvailabilitySync {
    pub fn new(feed: Arc<dyn AvailabilityFeed>, carparks: Arc<dyn CarparkRepository>) -> Self {
        Self { feed, carparks }
    }

    /// Fetch the feed and overwrite lot data for known carparks.
    ///
    /// Fetch and decode failures abort before the store is touched.
    pub async fn sync(&self) -> Result<AvailabilitySyncReport, Error> {
        let batch = self.feed.fetch_availability().await.map_err(|error| {
            warn!(%error, retryable = error.is_retryable(), "availability fetch failed");
            map_feed_error(error)
        })?;
        let received = batch.received();
        let rejected = batch.rejected;
        let records = collapse_duplicates(batch.records);

        let updated = if records.is_empty() {
            0
        } else {
            self.carparks
                .apply_availability(&records)
                .await
                .map_err(map_carpark_repository_error)?
        };

        let report = AvailabilitySyncReport {
            received,
            updated,
            skipped_unknown: records.len().saturating_sub(updated),
            rejected,
        };
        info!(
            received = report.received,
            updated = report.updated,
            skipped_unknown = report.skipped_unknown,
            rejected = report.rejected,
            "availability sync finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{AvailabilityBatch, MockAvailabilityFeed, MockCarparkRepository};
    use rstest::rstest;

    fn record(id: &str, available: u32) -> AvailabilityRecord {
        AvailabilityRecord {
            id: CarparkId::new(id).expect("carpark id"),
            total_lots: 105,
            lots_available: available,
            lot_type: "C".to_owned(),
            updated_at: "2024-03-01T10:15:02".to_owned(),
        }
    }

    fn feed_returning(batch: AvailabilityBatch) -> MockAvailabilityFeed {
        let mut feed = MockAvailabilityFeed::new();
        feed.expect_fetch_availability()
            .times(1)
            .return_once(move || Ok(batch));
        feed
    }

    #[rstest]
    fn duplicates_collapse_to_last_occurrence() {
        let collapsed = collapse_duplicates(vec![
            record("ACB", 1),
            record("AH1", 2),
            record("ACB", 3),
        ]);
        let summary: Vec<(&str, u32)> = collapsed
            .iter()
            .map(|r| (r.id.as_str(), r.lots_available))
            .collect();
        assert_eq!(summary, [("ACB", 3), ("AH1", 2)]);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_identifiers_are_counted_as_skipped() {
        let feed = feed_returning(AvailabilityBatch {
            records: vec![record("ACB", 12), record("ZZ9", 4), record("ACB", 10)],
            rejected: 1,
        });
        let mut repo = MockCarparkRepository::new();
        repo.expect_apply_availability()
            .withf(|records| records.len() == 2 && records[0].lots_available == 10)
            .times(1)
            .return_once(|_| Ok(1));

        let report = AvailabilitySync::new(Arc::new(feed), Arc::new(repo))
            .sync()
            .await
            .expect("sync succeeds");
        assert_eq!(
            report,
            AvailabilitySyncReport {
                received: 4,
                updated: 1,
                skipped_unknown: 1,
                rejected: 1,
            }
        );
    }

    #[rstest]
    #[case(AvailabilityFeedError::timeout("15s"), ErrorCode::ServiceUnavailable)]
    #[case(AvailabilityFeedError::decode("missing items"), ErrorCode::InternalError)]
    #[tokio::test]
    async fn fetch_failures_leave_the_store_alone(
        #[case] failure: AvailabilityFeedError,
        #[case] expected: ErrorCode,
    ) {
        let mut feed = MockAvailabilityFeed::new();
        feed.expect_fetch_availability()
            .times(1)
            .return_once(move || Err(failure));
        let mut repo = MockCarparkRepository::new();
        repo.expect_apply_availability().never();

        let error = AvailabilitySync::new(Arc::new(feed), Arc::new(repo))
            .sync()
            .await
            .expect_err("sync fails");
        assert_eq!(error.code(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn empty_feed_skips_the_store() {
        let feed = feed_returning(AvailabilityBatch::default());
        let mut repo = MockCarparkRepository::new();
        repo.expect_apply_availability().never();

        let report = AvailabilitySync::new(Arc::new(feed), Arc::new(repo))
            .sync()
            .await
            .expect("sync succeeds");
        assert_eq!(report, AvailabilitySyncReport::default());
    }
}
