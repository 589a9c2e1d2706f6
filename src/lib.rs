/// Mixset Catalog
///
/// Scrapes a creator profile on a mix-hosting site, visits each published
/// set, and turns the loosely formatted page text into a typed dataset that
/// can be filtered, exported, and rendered into documents for indexing.

pub mod config;
pub mod documents;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod walker;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder, ExportFormat};
pub use crate::documents::{build_documents, render_document, SetDocument};
pub use crate::error::{Result, ScrapeError};
pub use crate::export::{load_dataset_csv, Exporter};
pub use crate::fetch::{BrowserDriver, PageFetcher, ParsedDocument, Session};
pub use crate::filter::{apply_filters, name_list, tag_vocabulary, DatasetBounds, FilterCriteria};
pub use crate::normalize::{normalize, Dataset, JoinedRow, NormalizedSetRecord, Normalizer};
pub use crate::parser::{EntityParser, FieldMiss, ProfileRecord, RawSetRecord};
pub use crate::pipeline::{scrape_profile, ScrapeOptions, ScrapeOutcome, ScrapePipeline};
pub use crate::walker::{CollectionWalker, ScrapeReport, WalkerSettings};
