//! Query and aggregation engines.
//!
//! Both run a title-weighted multi-field match (`title^2`, `explanation`)
//! against a [`DocumentStore`](crate::store::DocumentStore):
//!
//! - [`search`] returns a page of hits and the page count, optionally
//!   restricted to one calendar year
//! - [`semantic_search`] does the same with a nearest-neighbour query on
//!   the embedded text
//! - [`year_histogram`] counts matching documents per year

mod aggregation;
mod engine;
mod error;
mod query;

pub use aggregation::{year_histogram, DocsPerYear, DOCS_PER_YEAR};
pub use engine::{max_pages, search, semantic_search, QueryResult};
pub use error::{AggregationError, QueryError};
pub use query::{year_range, QueryRequest, Year, DEFAULT_LIMIT};
