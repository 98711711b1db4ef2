//! # Search Sync Shared
//!
//! This crate defines the data structures shared across the search
//! synchronization layer: query and option types, search hits, index
//! descriptors, and the page objects produced by a search.

pub mod types;

pub use types::index_descriptor::IndexDescriptor;
pub use types::page::{
    page_offset, CountPage, OffsetPage, PageStyle, Paginated, PaginationError, Paginator,
};
pub use types::search_hit::{HitRecord, SearchHit, SearchResponse};
pub use types::search_query::{
    DefaultOperator, NumericParam, SearchOptions, SearchQuery, SearchRequest, Sort, SortDirection,
    SortField,
};
