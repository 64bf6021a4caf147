//! Canonical invoice record.

use serde::{Deserialize, Serialize};

use super::pagination::serial_number;

/// Currency every portal document is reported in.
pub const INVOICE_CURRENCY: &str = "EGP";

/// One normalized invoice entry, independent of where it was scraped from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    /// Global ordinal across all pages of one acquisition run (1-based).
    pub serial_number: u64,
    pub page_number: u32,
    /// Portal-assigned unique id (document UUID).
    pub electronic_number: String,
    pub internal_number: String,
    pub document_type: String,
    pub document_version: String,
    pub status: String,
    pub issue_date: String,
    pub submission_date: String,
    pub total_amount: String,
    pub invoice_value: String,
    pub vat_amount: String,
    pub seller_name: String,
    pub seller_tax_number: String,
    pub buyer_name: String,
    pub buyer_tax_number: String,
    pub invoice_currency: String,
    /// Public share link, empty when the electronic number is unknown.
    pub external_link: String,
}

impl InvoiceRecord {
    /// Create an empty record positioned at `index_within_page` (0-based) of `page_number`.
    pub fn new(page_number: u32, index_within_page: usize) -> Self {
        Self {
            serial_number: serial_number(page_number, index_within_page),
            page_number,
            electronic_number: String::new(),
            internal_number: String::new(),
            document_type: String::new(),
            document_version: String::new(),
            status: String::new(),
            issue_date: String::new(),
            submission_date: String::new(),
            total_amount: String::new(),
            invoice_value: String::new(),
            vat_amount: String::new(),
            seller_name: String::new(),
            seller_tax_number: String::new(),
            buyer_name: String::new(),
            buyer_tax_number: String::new(),
            invoice_currency: INVOICE_CURRENCY.to_string(),
            external_link: String::new(),
        }
    }

    /// A record is kept only if it carries at least one identifying value.
    pub fn is_valid(&self) -> bool {
        !self.electronic_number.is_empty()
            || !self.internal_number.is_empty()
            || !self.total_amount.is_empty()
    }
}
