//! Acquisition of invoice records from the e-invoicing portal.
//!
//! The visible result grid is inspected for its pagination state, then every
//! page is acquired either through the documents API (when its endpoint and
//! credentials have been observed) or by rendering each page out of band.

pub mod endpoint;
pub mod fetcher;
pub mod format;
pub mod host;
pub mod loader;
pub mod markers;
pub mod normalize;
pub mod pagination;
pub mod pipeline;

pub use endpoint::{
    CredentialSnapshot, EndpointContext, EndpointInfo, EndpointObserver, ObservedRequest,
    RequestTap,
};
pub use fetcher::PageFetcher;
pub use host::{HostPage, StaticPage};
pub use loader::{BrowsingContext, BrowsingContextFactory, OutOfBandPageLoader};
pub use normalize::{extract_rows, normalize, normalize_items, RawInvoice};
pub use pagination::PaginationInspector;
pub use pipeline::{AggregationPipeline, BatchProgress, PipelineSettings, ProgressSink};
