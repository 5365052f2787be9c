//! # bibhunt
//!
//! Find a paper from its title (typed, pasted, or recognized from a pasted
//! screenshot) and get its BibTeX.
//!
//! ## Architecture
//!
//! - [`editor`]: VIM-style modal editor for the query buffer
//! - [`clipboard`]: paste classification (text vs. image) and OCR
//! - [`sources`]: search backends behind the [`Source`] trait
//! - [`search`]: concurrent multi-source search with round-robin merging
//! - [`navigator`]: browsing, abstract view and selection of results
//! - [`resolve`]: DOI to BibTeX
//! - [`console`]: the interactive session tying the above together
//! - [`config`], [`ui`], [`utils`]: configuration, terminal output, helpers

pub mod clipboard;
pub mod config;
pub mod console;
pub mod editor;
pub mod models;
pub mod navigator;
pub mod resolve;
pub mod search;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{ResultList, SearchQuery, SearchResult};
pub use search::{SearchAggregator, SearchOutcome, SearchReport};
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
