//! Waypoint - Multilingual Place Search
//!
//! Waypoint is a forward geocoder core. It turns free text (plus an optional
//! language and map center) into a ranked list of places from a document
//! index, and presents them as localized GeoJSON features.
//!
//! # Quick Start
//!
//! ```rust
//! use waypoint::{PlaceSearcher, SearchRequest, data::test_data};
//!
//! # tokio::runtime::Runtime::new()?.block_on(async {
//! let searcher = PlaceSearcher::in_memory(&test_data::sample_documents())?;
//!
//! let request = SearchRequest::new("25 rue bergère paris").with_language("fr");
//! let results = searcher.search(&request).await?;
//!
//! let first = &results.features[0].properties;
//! assert_eq!(first.housenumber.as_deref(), Some("25"));
//! assert_eq!(first.street.as_deref(), Some("Rue Bergère"));
//! # Ok::<(), waypoint::error::WaypointError>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # How a search runs
//!
//! - **Locale**: `de`, `en`, `fr` and `it` are supported; anything else falls
//!   back to English.
//! - **Matching**: the query is matched against name, city, street, country
//!   and context in the request's language and the language-neutral variant,
//!   plus housenumber and postcode, each field with its own weight. Exact
//!   names weigh the most.
//! - **Strict, then relaxed**: every token has to match first; only if that
//!   finds nothing is a single retry made where any token suffices.
//! - **Scoring**: text relevance is multiplied by an importance boost and,
//!   when a center is given, by a distance decay.
//! - **Addresses**: numbered address records only show up when the query
//!   mentions their number.
//!
//! The index is pluggable through [`PlaceIndex`]; [`TantivyPlaceIndex`] is
//! the bundled implementation.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod core;
pub mod error;
mod index;
mod localize;
mod search;

pub use crate::core::PlaceSearcher;

pub use config::{ConfigError, SearchConfig, SearchConfigBuilder, WeightsBuilder};
pub use index::{Hit, IndexError, IndexResponse, PlaceIndex, PlaceQuery, TantivyPlaceIndex};
pub use localize::{Feature, FeatureCollection, Point, Properties, ResultLocalizer};
pub use search::{
    Attempt, DistanceDecay, FieldBoost, FieldPath, FieldWeights, Fuzziness, HousenumberGuard,
    ImportanceBoost, MatchSpec, QueryCompiler, RawSearchParams, ScoringPolicy, SearchError,
    SearchOutcome, SearchRequest, Strictness, TextField,
};
pub use waypoint_data as data;
pub use waypoint_data::{Coordinate, Document, Locale, LocaleKey, LocalizedText};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Waypoint library.
///
/// Installs a `tracing` fmt subscriber. `RUST_LOG` takes precedence over
/// `level` when set. Safe to call more than once; only the first call
/// installs anything.
///
/// ```rust
/// use tracing::Level;
/// use waypoint::init_logging;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), waypoint::error::WaypointError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::WaypointError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    })
}
