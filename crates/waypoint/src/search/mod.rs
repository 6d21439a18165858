//! Query compilation, scoring and search orchestration.
//!
//! This module turns a [`SearchRequest`] into one or two [`PlaceQuery`](crate::index::PlaceQuery)s
//! (a strict attempt and, when that finds nothing, a relaxed retry) and
//! hands the winning documents to the localizer.

pub use error::SearchError;
mod compiler;
mod guard;
mod request;
mod scoring;
mod search_orchestration;

pub use compiler::{
    FieldBoost, FieldPath, FieldWeights, Fuzziness, MatchSpec, QueryCompiler, Strictness,
    TextField, exact_form,
};
use error::Result;
pub use guard::HousenumberGuard;
pub use request::{RawSearchParams, SearchRequest};
pub use scoring::{DistanceDecay, ImportanceBoost, ScoringPolicy};
pub use search_orchestration::{Attempt, SearchOutcome, place_search_inner};

mod error {
    use std::time::Duration;

    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Missing or empty query")]
        EmptyQuery,
        #[error("Index error: {0}")]
        Index(#[from] crate::index::IndexError),
        #[error("Index did not answer within {0:?}")]
        Timeout(Duration),
        #[error("Index task failed: {0}")]
        Join(#[from] tokio::task::JoinError),
    }

    impl SearchError {
        /// Whether the caller sent a bad request, as opposed to the index
        /// failing. Only the former is worth reporting back verbatim.
        pub const fn is_client_error(&self) -> bool {
            matches!(self, Self::EmptyQuery)
        }
    }

    pub type Result<T> = std::result::Result<T, SearchError>;
}
