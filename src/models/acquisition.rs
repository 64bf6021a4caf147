//! Result of one full acquisition run.

use serde::{Deserialize, Serialize};

use super::InvoiceRecord;

/// Report returned by the aggregation pipeline.
///
/// `total_processed` falling short of `expected_total` signals a silent
/// partial success: some pages failed and contributed no records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionResult {
    pub success: bool,
    pub data: Vec<InvoiceRecord>,
    pub total_processed: usize,
    pub expected_total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AcquisitionResult {
    pub fn completed(data: Vec<InvoiceRecord>, expected_total: u64) -> Self {
        Self {
            success: true,
            total_processed: data.len(),
            data,
            expected_total,
            error: None,
        }
    }

    pub fn failed(data: Vec<InvoiceRecord>, expected_total: u64, error: String) -> Self {
        Self {
            success: false,
            total_processed: data.len(),
            data,
            expected_total,
            error: Some(error),
        }
    }

    /// Records missing compared to the count the portal reported.
    pub fn shortfall(&self) -> u64 {
        self.expected_total
            .saturating_sub(self.total_processed as u64)
    }
}
