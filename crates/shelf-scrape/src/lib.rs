//! shelf-scrape: catalogue search, detail extraction, cover caching and the
//! import pipeline that feeds `shelf-core` storage.

pub mod assemble;
pub mod config;
pub mod cover;
pub mod detail;
pub mod error;
pub mod extract;
pub mod http;
pub mod identifiers;
pub mod import;
pub mod search;
pub mod types;

pub use assemble::{assemble, assemble_from_detail};
pub use config::ScrapeConfig;
pub use cover::{CoverCache, CoverKey};
pub use detail::DetailNormalizer;
pub use error::{Result, ScrapeError};
pub use extract::{DetailExtractor, ExtractorRegistry};
pub use import::{ImportOutcome, Importer};
pub use search::SearchResolver;
pub use types::{DetailRecord, SearchCandidate};
