//! The document index collaborator.
//!
//! The search core never talks to a storage engine directly. It hands a
//! [`PlaceQuery`] (match specification, scoring policy, housenumber guard and
//! limit) to a [`PlaceIndex`] and gets scored documents back. Implementations
//! must be safe to share between concurrently running requests.
//!
//! [`TantivyPlaceIndex`] is the bundled implementation, built on Tantivy.

mod dsl;
mod fts;

pub use error::IndexError;
pub use fts::TantivyPlaceIndex;
use waypoint_data::Document;

use crate::search::{HousenumberGuard, MatchSpec, ScoringPolicy};

/// Everything an index needs to execute one search attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub match_spec: MatchSpec,
    pub scoring: ScoringPolicy,
    pub guard: HousenumberGuard,
    pub limit: usize,
}

impl PlaceQuery {
    /// Render as an Elasticsearch/OpenSearch query body.
    pub fn to_dsl(&self) -> serde_json::Value {
        dsl::render(self)
    }
}

/// A scored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub score: f64,
    pub document: Document,
}

/// Result of one executed [`PlaceQuery`]: the total number of matching
/// documents and the best `limit` of them, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexResponse {
    pub total_hits: usize,
    pub hits: Vec<Hit>,
}

impl IndexResponse {
    pub fn is_empty(&self) -> bool {
        self.total_hits == 0 && self.hits.is_empty()
    }
}

/// A document index able to execute place queries.
pub trait PlaceIndex: std::fmt::Debug + Send + Sync + 'static {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Execute a single query. Implementations must apply the guard as a
    /// filter, the scoring policy to every hit, and return at most
    /// `query.limit` hits ordered by descending final score.
    fn execute(&self, query: &PlaceQuery) -> Result<IndexResponse, IndexError>;
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error("Stored document error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, IndexError>;
}
