//! Core data models for search results and queries.

mod record;
mod result_list;
mod search;

pub use record::{SearchResult, SearchResultBuilder, SourceType};
pub use result_list::ResultList;
pub use search::{MergeMode, SearchQuery};
