//! DTOs for decoding the carpark availability payload.
//!
//! Lot counts arrive as strings in the published feed; numbers are accepted
//! too. Each record is validated on its own so one bad record does not sink
//! the payload.

use serde::Deserialize;

use crate::domain::ports::AvailabilityBatch;
use crate::domain::{AvailabilityRecord, CarparkId};

#[derive(Debug, Deserialize)]
pub(super) struct AvailabilityResponseDto {
    pub(super) items: Vec<AvailabilityItemDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AvailabilityItemDto {
    #[serde(default)]
    pub(super) carpark_data: Vec<CarparkDataDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CarparkDataDto {
    #[serde(default)]
    pub(super) carpark_number: Option<String>,
    #[serde(default)]
    pub(super) update_datetime: Option<String>,
    #[serde(default)]
    pub(super) carpark_info: Vec<CarparkInfoDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CarparkInfoDto {
    #[serde(default)]
    pub(super) total_lots: Option<CountDto>,
    #[serde(default)]
    pub(super) lot_type: Option<String>,
    #[serde(default)]
    pub(super) lots_available: Option<CountDto>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum CountDto {
    Text(String),
    Number(i64),
}

impl CountDto {
    fn parse(&self) -> Option<u32> {
        match self {
            Self::Text(raw) => raw.trim().parse().ok(),
            Self::Number(value) => u32::try_from(*value).ok(),
        }
    }
}

impl CarparkDataDto {
    fn into_record(self) -> Result<AvailabilityRecord, String> {
        let raw_id = self.carpark_number.unwrap_or_default();
        let id = CarparkId::new(&raw_id).map_err(|err| format!("carpark_number {raw_id:?}: {err}"))?;
        let info = self
            .carpark_info
            .into_iter()
            .next()
            .ok_or_else(|| format!("{id}: empty carpark_info"))?;
        let total_lots = info
            .total_lots
            .as_ref()
            .and_then(CountDto::parse)
            .ok_or_else(|| format!("{id}: unparsable total_lots"))?;
        let lots_available = info
            .lots_available
            .as_ref()
            .and_then(CountDto::parse)
            .ok_or_else(|| format!("{id}: unparsable lots_available"))?;
        Ok(AvailabilityRecord {
            id,
            total_lots,
            lots_available,
            lot_type: info.lot_type.unwrap_or_default().trim().to_owned(),
            updated_at: self.update_datetime.unwrap_or_default().trim().to_owned(),
        })
    }
}

impl AvailabilityResponseDto {
    /// Validate every record, returning the batch and the rejection reasons.
    pub(super) fn into_batch(self) -> Result<(AvailabilityBatch, Vec<String>), String> {
        let item = self
            .items
            .into_iter()
            .next()
            .ok_or_else(|| "payload has no items".to_owned())?;
        let mut batch = AvailabilityBatch::default();
        let mut reasons = Vec::new();
        for data in item.carpark_data {
            match data.into_record() {
                Ok(record) => batch.records.push(record),
                Err(reason) => {
                    batch.rejected += 1;
                    reasons.push(reason);
                }
            }
        }
        if batch.records.is_empty() && batch.rejected > 0 {
            return Err(format!(
                "none of the {} records were valid; first problem: {}",
                batch.rejected,
                reasons.first().map(String::as_str).unwrap_or("unknown")
            ));
        }
        Ok((batch, reasons))
    }
}
