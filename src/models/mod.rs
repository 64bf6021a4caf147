//! Data models for eta-export.

mod acquisition;
mod invoice;
mod pagination;

pub use acquisition::AcquisitionResult;
pub use invoice::{InvoiceRecord, INVOICE_CURRENCY};
pub use pagination::{serial_number, total_pages, PaginationState, RESULTS_PER_PAGE};
