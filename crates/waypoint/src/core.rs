//! The main [`PlaceSearcher`] interface.
//!
//! A searcher pairs a shared [`PlaceIndex`] with a [`SearchConfig`]. It holds
//! no per-request state, so one instance (or cheap clones of it) can serve any
//! number of concurrent requests.
//!
//! # Quick Start
//!
//! ```rust
//! use waypoint::{PlaceSearcher, SearchRequest, data::test_data};
//!
//! # tokio::runtime::Runtime::new()?.block_on(async {
//! let searcher = PlaceSearcher::in_memory(&test_data::sample_documents())?;
//! let results = searcher.search(&SearchRequest::new("berlin")).await?;
//! assert_eq!(results.features[0].properties.name.as_deref(), Some("Berlin"));
//! # Ok::<(), waypoint::error::WaypointError>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{path::Path, sync::Arc};

use futures::future::join_all;
use tracing::{info, instrument};
use waypoint_data::{Document, get_data_dir, read_documents};

use crate::{
    config::SearchConfig,
    error::WaypointError,
    index::{PlaceIndex, TantivyPlaceIndex},
    localize::FeatureCollection,
    search::{SearchOutcome, SearchRequest, place_search_inner},
};

/// Forward geocoder over a [`PlaceIndex`].
#[derive(Debug, Clone)]
pub struct PlaceSearcher {
    index: Arc<dyn PlaceIndex>,
    config: SearchConfig,
}

impl PlaceSearcher {
    /// Create a searcher over any index implementation, with the default
    /// configuration.
    pub fn new(index: Arc<dyn PlaceIndex>) -> Self {
        Self {
            index,
            config: SearchConfig::default(),
        }
    }

    /// Create a searcher over an in-memory Tantivy index of `documents`.
    #[instrument(name = "Create In-Memory PlaceSearcher", level = "info", skip_all, fields(num_documents = documents.len()))]
    pub fn in_memory(documents: &[Document]) -> Result<Self, WaypointError> {
        let index = TantivyPlaceIndex::in_memory(documents)?;
        Ok(Self::new(Arc::new(index)))
    }

    /// Create a searcher over an in-memory index of a JSON-lines document dump.
    #[instrument(name = "Create PlaceSearcher From Dump", level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_dump(path: impl AsRef<Path>) -> Result<Self, WaypointError> {
        let t_init = std::time::Instant::now();
        let documents = read_documents(path)?;
        let searcher = Self::in_memory(&documents)?;
        info!(
            num_documents = documents.len(),
            elapsed_seconds = ?t_init.elapsed(),
            "PlaceSearcher initialization complete"
        );
        Ok(searcher)
    }

    /// Create a searcher over an on-disk index at `path`, reusing it when it
    /// is up to date with `documents`.
    pub fn open(
        path: impl AsRef<Path>,
        documents: &[Document],
        overwrite: bool,
    ) -> Result<Self, WaypointError> {
        let index = TantivyPlaceIndex::open_or_create(path, documents, overwrite)?;
        Ok(Self::new(Arc::new(index)))
    }

    /// Like [`PlaceSearcher::open`], with the index stored as `name` under
    /// the data directory (`WAYPOINT_DATA_DIR`).
    pub fn open_in_data_dir(name: &str, documents: &[Document]) -> Result<Self, WaypointError> {
        Self::open(get_data_dir().join(name), documents, false)
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn index(&self) -> &dyn PlaceIndex {
        self.index.as_ref()
    }

    /// Search for places matching `request`.
    ///
    /// Runs a strict attempt and, only if it finds nothing, one relaxed
    /// attempt. The results are localized to the request's language.
    pub async fn search(&self, request: &SearchRequest) -> Result<FeatureCollection, WaypointError> {
        self.search_with_outcome(request)
            .await
            .map(|outcome| outcome.features)
    }

    /// Like [`PlaceSearcher::search`], also reporting which attempt produced
    /// the results.
    pub async fn search_with_outcome(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchOutcome, WaypointError> {
        place_search_inner(&self.index, request, &self.config)
            .await
            .map_err(From::from)
    }

    /// Run independent requests concurrently. Results come back in input
    /// order; one failing request does not affect the others.
    #[instrument(name = "Bulk Place Search", level = "info", skip_all, fields(num_requests = requests.len()))]
    pub async fn search_bulk(
        &self,
        requests: &[SearchRequest],
    ) -> Vec<Result<FeatureCollection, WaypointError>> {
        join_all(requests.iter().map(|request| self.search(request))).await
    }
}

#[cfg(test)]
mod tests {
    use waypoint_data::test_data;

    use super::*;
    use crate::SearchConfigBuilder;

    fn searcher() -> PlaceSearcher {
        PlaceSearcher::in_memory(&test_data::sample_documents()).unwrap()
    }

    #[tokio::test]
    async fn test_search_berlin() {
        let results = searcher().search(&SearchRequest::new("berlin")).await.unwrap();
        assert_eq!(results.features[0].properties.osm_id, test_data::BERLIN_ID);
    }

    #[tokio::test]
    async fn test_from_dump() {
        let dump = test_data::create_test_dump().unwrap();
        let searcher = PlaceSearcher::from_dump(dump.path()).unwrap();
        let results = searcher.search(&SearchRequest::new("paris")).await.unwrap();
        assert!(!results.is_empty());
    }

    #[test]
    fn test_missing_dump_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlaceSearcher::from_dump(dir.path().join("missing.jsonl")).unwrap_err();
        assert!(matches!(
            err,
            WaypointError::DataError(waypoint_data::DataError::Io(_))
        ));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let docs = test_data::sample_documents();
        let searcher = PlaceSearcher::open(dir.path().join("places"), &docs, false).unwrap();
        let results = searcher.search(&SearchRequest::new("hauptbahnhof")).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_config_limit_applies() {
        let config = SearchConfigBuilder::new().default_limit(1).build().unwrap();
        let searcher = searcher().with_config(config);
        let results = searcher.search(&SearchRequest::new("hauptbahnhof")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(searcher.config().default_limit, 1);
    }

    #[tokio::test]
    async fn test_search_bulk_keeps_order_and_isolates_errors() {
        let requests = [
            SearchRequest::new("paris"),
            SearchRequest::new(" "),
            SearchRequest::new("berlin"),
        ];
        let results = searcher().search_bulk(&requests).await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap().features[0].properties.osm_id,
            test_data::PARIS_ID
        );
        assert!(results[1].as_ref().unwrap_err().is_client_error());
        assert_eq!(
            results[2].as_ref().unwrap().features[0].properties.osm_id,
            test_data::BERLIN_ID
        );
    }

    #[test]
    fn test_searcher_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<PlaceSearcher>();
        assert_eq!(searcher().index().name(), "tantivy");
    }
}
