//! Search requests and lenient parsing of raw request parameters.

use waypoint_data::Coordinate;

use super::{Result, SearchError};

/// One forward-geocoding request.
///
/// Only the query text is mandatory. Language, center and limit are all
/// optional and never make a request invalid: an unsupported language falls
/// back to English, a bad coordinate disables location bias and a bad limit
/// is replaced or clamped when the search runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    query: String,
    language: Option<String>,
    center: Option<Coordinate>,
    limit: Option<i64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: None,
            center: None,
            limit: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_center(mut self, center: Coordinate) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build a request from raw string parameters as an HTTP layer receives
    /// them. Fails only when the query text is missing or blank.
    ///
    /// ```rust
    /// use waypoint::{RawSearchParams, SearchRequest};
    ///
    /// let request = SearchRequest::from_params(&RawSearchParams {
    ///     q: Some("berlin"),
    ///     lat: Some("52.5"),
    ///     lon: Some("not-a-number"),
    ///     limit: Some("many"),
    ///     ..Default::default()
    /// })?;
    /// assert!(request.center().is_none());
    /// assert!(request.limit().is_none());
    /// # Ok::<(), waypoint::SearchError>(())
    /// ```
    pub fn from_params(params: &RawSearchParams<'_>) -> Result<Self> {
        let query = params
            .q
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(SearchError::EmptyQuery)?;

        Ok(Self {
            query: query.to_owned(),
            language: params.lang.map(str::to_owned),
            center: Coordinate::parse(params.lat, params.lon),
            limit: params.limit.and_then(|l| l.trim().parse::<i64>().ok()),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub const fn center(&self) -> Option<&Coordinate> {
        self.center.as_ref()
    }

    pub const fn limit(&self) -> Option<i64> {
        self.limit
    }
}

/// Request parameters exactly as received, before any validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSearchParams<'a> {
    pub q: Option<&'a str>,
    pub lang: Option<&'a str>,
    pub lat: Option<&'a str>,
    pub lon: Option<&'a str>,
    pub limit: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_params_full() {
        let request = SearchRequest::from_params(&RawSearchParams {
            q: Some(" berlin "),
            lang: Some("de"),
            lat: Some("52.52"),
            lon: Some("13.40"),
            limit: Some("5"),
        })
        .unwrap();
        assert_eq!(request.query(), "berlin");
        assert_eq!(request.language(), Some("de"));
        assert_eq!(request.center(), Coordinate::new(52.52, 13.40).as_ref());
        assert_eq!(request.limit(), Some(5));
    }

    #[test]
    fn test_from_params_requires_query() {
        for q in [None, Some(""), Some("   ")] {
            let result = SearchRequest::from_params(&RawSearchParams {
                q,
                ..Default::default()
            });
            assert!(matches!(result, Err(SearchError::EmptyQuery)));
        }
    }

    #[test]
    fn test_partial_coordinate_is_ignored() {
        let request = SearchRequest::from_params(&RawSearchParams {
            q: Some("paris"),
            lat: Some("48.85"),
            ..Default::default()
        })
        .unwrap();
        assert!(request.center().is_none());
    }

    #[test]
    fn test_out_of_range_limit_is_kept_for_clamping() {
        let request = SearchRequest::from_params(&RawSearchParams {
            q: Some("paris"),
            limit: Some("-4"),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.limit(), Some(-4));
    }
}
