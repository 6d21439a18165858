//! The strict-then-relaxed attempt machine.
//!
//! Every request starts with a strict attempt (every token must match). Only a
//! clean zero-hit answer moves it to a single relaxed attempt (any token
//! suffices); a relaxed attempt is terminal. Index failures and timeouts end
//! the request immediately and are never retried.

use std::{sync::Arc, time::Instant};

use tracing::{debug, info, instrument, warn};
use waypoint_data::Locale;

use super::{HousenumberGuard, Result, SearchError, SearchRequest, Strictness};
use crate::{
    config::SearchConfig,
    index::{IndexResponse, PlaceIndex, PlaceQuery},
    localize::{FeatureCollection, ResultLocalizer},
};

/// Where a request is in its attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attempt {
    Strict,
    Relaxed,
}

impl Attempt {
    pub const fn strictness(self) -> Strictness {
        match self {
            Self::Strict => Strictness::Strict,
            Self::Relaxed => Strictness::Relaxed,
        }
    }

    /// The attempt to issue after this one returned `hits` documents, if any.
    pub const fn next(self, hits: usize) -> Option<Self> {
        match (self, hits) {
            (Self::Strict, 0) => Some(Self::Relaxed),
            _ => None,
        }
    }
}

/// Localized results plus how they were obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// The attempt whose response produced `features`.
    pub attempt: Attempt,
    /// Number of index calls made for the request (1 or 2).
    pub attempts_issued: usize,
    /// Total matching documents reported by the final attempt.
    pub total_hits: usize,
    pub locale: Locale,
    pub features: FeatureCollection,
}

async fn execute_attempt(
    index: &Arc<dyn PlaceIndex>,
    query: PlaceQuery,
    config: &SearchConfig,
) -> Result<IndexResponse> {
    let index = Arc::clone(index);
    let task = tokio::task::spawn_blocking(move || index.execute(&query));
    match tokio::time::timeout(config.index_timeout, task).await {
        Ok(joined) => Ok(joined??),
        Err(_) => Err(SearchError::Timeout(config.index_timeout)),
    }
}

#[instrument(name = "Place Search", skip_all, level = "info", fields(query = request.query(), index = index.name()))]
pub async fn place_search_inner(
    index: &Arc<dyn PlaceIndex>,
    request: &SearchRequest,
    config: &SearchConfig,
) -> Result<SearchOutcome> {
    let text = request.query().trim();
    if text.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let locale = Locale::resolve(request.language());
    let limit = config.effective_limit(request.limit());
    let fetch_limit = config.fetch_limit(limit);
    let compiler = config.compiler();
    let scoring = config.scoring_policy(request.center());
    let guard = HousenumberGuard::new(text, locale);
    debug!(%locale, limit, fetch_limit, biased = request.center().is_some(), "Resolved request");

    let t_search = Instant::now();
    let mut attempt = Attempt::Strict;
    let mut attempts_issued = 0;
    let response = loop {
        let query = PlaceQuery {
            match_spec: compiler.compile(text, locale, attempt.strictness()),
            scoring,
            guard: guard.clone(),
            limit: fetch_limit,
        };
        attempts_issued += 1;

        let response = execute_attempt(index, query, config).await.inspect_err(|e| {
            warn!(?attempt, error = %e, "Index attempt failed");
        })?;
        debug!(?attempt, hits = response.hits.len(), total_hits = response.total_hits, "Attempt complete");

        match attempt.next(response.hits.len()) {
            Some(next) => attempt = next,
            None => break response,
        }
    };

    let localizer = ResultLocalizer::new(locale, config.dedupe_streets);
    let mut features = localizer.localize_all(response.hits.iter().map(|hit| &hit.document));
    features.truncate(limit);
    info!(
        ?attempt,
        attempts_issued,
        results = features.len(),
        elapsed = ?t_search.elapsed(),
        "Place search complete"
    );

    Ok(SearchOutcome {
        attempt,
        attempts_issued,
        total_hits: response.total_hits,
        locale,
        features,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use waypoint_data::{Coordinate, Document, LocalizedText};

    use super::*;
    use crate::index::{Hit, IndexError};

    /// Answers from a fixed script, one entry per call, and records what it saw.
    #[derive(Debug, Default)]
    struct ScriptedIndex {
        hits_per_call: Vec<usize>,
        fail: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
        seen: Mutex<Vec<PlaceQuery>>,
    }

    impl ScriptedIndex {
        fn answering(hits_per_call: &[usize]) -> Self {
            Self {
                hits_per_call: hits_per_call.to_vec(),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn seen(&self) -> Vec<PlaceQuery> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl PlaceIndex for ScriptedIndex {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn execute(&self, query: &PlaceQuery) -> std::result::Result<IndexResponse, IndexError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(query.clone());
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if self.fail {
                return Err(IndexError::Other(anyhow::anyhow!("shard unavailable")));
            }

            let n = self.hits_per_call.get(call).copied().unwrap_or(0);
            let hits = (0..n)
                .map(|i| Hit {
                    score: 10.0 - i as f64,
                    document: Document {
                        name: LocalizedText::neutral(format!("Place {i}")),
                        ..Document::new(i as i64, Coordinate::new(0.0, 0.0).unwrap())
                    },
                })
                .take(query.limit)
                .collect::<Vec<_>>();
            Ok(IndexResponse {
                total_hits: n,
                hits,
            })
        }
    }

    async fn run(index: ScriptedIndex, request: &SearchRequest) -> (Arc<ScriptedIndex>, Result<SearchOutcome>) {
        let index = Arc::new(index);
        let dyn_index: Arc<dyn PlaceIndex> = index.clone();
        let outcome = place_search_inner(&dyn_index, request, &SearchConfig::default()).await;
        (index, outcome)
    }

    #[test]
    fn test_attempt_transitions() {
        assert_eq!(Attempt::Strict.next(0), Some(Attempt::Relaxed));
        assert_eq!(Attempt::Strict.next(3), None);
        assert_eq!(Attempt::Relaxed.next(0), None);
        assert_eq!(Attempt::Relaxed.next(1), None);
    }

    #[tokio::test]
    async fn test_strict_hit_issues_no_relaxed_attempt() {
        let (index, outcome) = run(ScriptedIndex::answering(&[3]), &SearchRequest::new("berlin")).await;
        let outcome = outcome.unwrap();

        assert_eq!(index.calls(), 1);
        assert_eq!(outcome.attempt, Attempt::Strict);
        assert_eq!(outcome.attempts_issued, 1);
        assert_eq!(outcome.features.len(), 3);
    }

    #[tokio::test]
    async fn test_strict_miss_issues_exactly_one_relaxed_attempt() {
        let (index, outcome) = run(ScriptedIndex::answering(&[0, 2]), &SearchRequest::new("berlin xyz")).await;
        let outcome = outcome.unwrap();

        assert_eq!(index.calls(), 2);
        assert_eq!(outcome.attempt, Attempt::Relaxed);
        assert_eq!(outcome.attempts_issued, 2);
        assert_eq!(outcome.features.len(), 2);

        let seen = index.seen();
        assert_eq!(seen[0].match_spec.strictness(), Strictness::Strict);
        assert_eq!(seen[1].match_spec.strictness(), Strictness::Relaxed);
        assert_eq!(seen[0].match_spec.fields(), seen[1].match_spec.fields());
        assert_eq!(seen[0].scoring, seen[1].scoring);
        assert_eq!(seen[0].guard, seen[1].guard);
        assert_eq!(seen[0].limit, seen[1].limit);
    }

    #[tokio::test]
    async fn test_relaxed_miss_is_terminal() {
        let (index, outcome) = run(ScriptedIndex::answering(&[0, 0, 5]), &SearchRequest::new("zzzqqqxxx999")).await;
        let outcome = outcome.unwrap();

        assert_eq!(index.calls(), 2);
        assert!(outcome.features.is_empty());
        assert_eq!(outcome.total_hits, 0);
    }

    #[tokio::test]
    async fn test_index_error_is_not_retried() {
        let index = ScriptedIndex {
            fail: true,
            ..ScriptedIndex::default()
        };
        let (index, outcome) = run(index, &SearchRequest::new("berlin")).await;

        assert!(matches!(outcome, Err(SearchError::Index(_))));
        assert!(!outcome.unwrap_err().is_client_error());
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let index = Arc::new(ScriptedIndex {
            delay: Some(Duration::from_millis(300)),
            ..ScriptedIndex::default()
        });
        let dyn_index: Arc<dyn PlaceIndex> = index.clone();
        let config = SearchConfig {
            index_timeout: Duration::from_millis(20),
            ..SearchConfig::default()
        };

        let outcome = place_search_inner(&dyn_index, &SearchRequest::new("berlin"), &config).await;
        assert!(matches!(outcome, Err(SearchError::Timeout(_))));
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_is_a_client_error() {
        let (index, outcome) = run(ScriptedIndex::answering(&[1]), &SearchRequest::new("   ")).await;
        let err = outcome.unwrap_err();

        assert!(matches!(err, SearchError::EmptyQuery));
        assert!(err.is_client_error());
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_parameters_are_resolved() {
        let request = SearchRequest::new("paris")
            .with_language("xx")
            .with_limit(500)
            .with_center(Coordinate::new(48.85, 2.35).unwrap());
        let (index, outcome) = run(ScriptedIndex::answering(&[80]), &request).await;
        let outcome = outcome.unwrap();

        assert_eq!(outcome.locale, Locale::En);
        assert_eq!(outcome.features.len(), 50);
        let seen = index.seen();
        assert_eq!(seen[0].limit, 75, "over-fetched for street de-duplication");
        assert!(seen[0].scoring.decay().is_some());
        assert_eq!(seen[0].guard.locale(), Locale::En);
    }

    fn street_segment(osm_id: i64) -> Document {
        Document {
            osm_key: Some("highway".into()),
            postcode: Some("1".into()),
            name: LocalizedText::neutral("Main Street"),
            ..Document::new(osm_id, Coordinate::new(0.0, 0.0).unwrap())
        }
    }

    /// Returns the same hits for every query, cut to the query's limit.
    #[derive(Debug)]
    struct FixedIndex(Vec<Document>);

    impl PlaceIndex for FixedIndex {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn execute(&self, query: &PlaceQuery) -> std::result::Result<IndexResponse, IndexError> {
            let hits: Vec<Hit> = self
                .0
                .iter()
                .take(query.limit)
                .map(|document| Hit {
                    score: 1.0,
                    document: document.clone(),
                })
                .collect();
            Ok(IndexResponse {
                total_hits: self.0.len(),
                hits,
            })
        }
    }

    #[tokio::test]
    async fn test_duplicate_segments_do_not_crowd_out_other_results() {
        let mut documents: Vec<Document> = (0..2).map(street_segment).collect();
        documents.push(Document {
            name: LocalizedText::neutral("Main Street Cafe"),
            ..Document::new(99, Coordinate::new(0.0, 0.0).unwrap())
        });
        documents.extend((2..5).map(street_segment));
        let index: Arc<dyn PlaceIndex> = Arc::new(FixedIndex(documents));

        let request = SearchRequest::new("main street").with_limit(2);
        let outcome = place_search_inner(&index, &request, &SearchConfig::default())
            .await
            .unwrap();
        let ids: Vec<i64> = outcome.features.iter().map(|f| f.properties.osm_id).collect();
        assert_eq!(ids, vec![0, 99]);

        let request = SearchRequest::new("main street").with_limit(10);
        let outcome = place_search_inner(&index, &request, &SearchConfig::default())
            .await
            .unwrap();
        assert_eq!(outcome.features.len(), 2, "one street plus the cafe");
    }

    #[tokio::test]
    async fn test_results_never_exceed_limit_after_over_fetch() {
        let documents: Vec<Document> = (0..10)
            .map(|i| Document {
                name: LocalizedText::neutral(format!("Place {i}")),
                ..Document::new(i, Coordinate::new(0.0, 0.0).unwrap())
            })
            .collect();
        let index: Arc<dyn PlaceIndex> = Arc::new(FixedIndex(documents));

        let request = SearchRequest::new("place").with_limit(4);
        let outcome = place_search_inner(&index, &request, &SearchConfig::default())
            .await
            .unwrap();
        assert_eq!(outcome.features.len(), 4);
    }
}
