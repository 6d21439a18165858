use std::time::Duration;

pub use error::ConfigError;
use error::Result;
use waypoint_data::Coordinate;

use crate::search::{DistanceDecay, FieldWeights, Fuzziness, ImportanceBoost, QueryCompiler, ScoringPolicy};

/// Configuration for place searches.
///
/// Use [`SearchConfigBuilder`] to derive a validated configuration from the
/// defaults or one of the presets.
///
/// ```rust
/// use waypoint::SearchConfigBuilder;
///
/// let config = SearchConfigBuilder::local().default_limit(5).build()?;
/// assert_eq!(config.effective_limit(None), 5);
/// assert_eq!(config.effective_limit(Some(500)), 50);
/// # Ok::<(), waypoint::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Results returned when the request names no limit.
    pub default_limit: usize,
    /// Upper bound for any requested limit.
    pub max_limit: usize,
    pub field_weights: FieldWeights,
    pub fuzziness: Fuzziness,
    /// `K` in `1 + importance × K`.
    pub importance_factor: f64,
    /// Distance at which the decay has (almost) reached its floor.
    pub decay_horizon_km: f64,
    /// Lowest multiplier the distance decay can produce, in (0, 1).
    pub decay_floor: f64,
    /// Deadline for a single index call.
    pub index_timeout: Duration,
    /// Collapse street segments sharing postcode and name.
    pub dedupe_streets: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 15,
            max_limit: 50,
            field_weights: FieldWeights::default(),
            fuzziness: Fuzziness::default(),
            importance_factor: 100.0,
            decay_horizon_km: 100.0,
            decay_floor: 0.2,
            index_timeout: Duration::from_secs(5),
            dedupe_streets: true,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        self.field_weights.validate()?;

        if !(self.importance_factor.is_finite() && self.importance_factor > 0.0) {
            return Err(ConfigError::InvalidScoring(format!(
                "importance factor must be positive, got {}",
                self.importance_factor
            )));
        }
        if !(self.decay_horizon_km.is_finite() && self.decay_horizon_km > 0.0) {
            return Err(ConfigError::InvalidScoring(format!(
                "decay horizon must be positive, got {} km",
                self.decay_horizon_km
            )));
        }
        if !(self.decay_floor > 0.0 && self.decay_floor < 1.0) {
            return Err(ConfigError::InvalidScoring(format!(
                "decay floor must lie in (0, 1), got {}",
                self.decay_floor
            )));
        }
        if self.max_limit == 0 || !(1..=self.max_limit).contains(&self.default_limit) {
            return Err(ConfigError::InvalidLimit(format!(
                "default limit {} must lie in [1, {}]",
                self.default_limit, self.max_limit
            )));
        }
        if self.index_timeout.is_zero() {
            return Err(ConfigError::InvalidLimit("index timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// The number of results to ask the index for. A missing limit means the
    /// default; anything else is clamped to `[1, max_limit]`.
    pub fn effective_limit(&self, requested: Option<i64>) -> usize {
        match requested {
            None => self.default_limit,
            Some(limit) => {
                let max = i64::try_from(self.max_limit).unwrap_or(i64::MAX).max(1);
                usize::try_from(limit.clamp(1, max)).unwrap_or(1)
            }
        }
    }

    /// How many hits to ask the index for so that `limit` results survive
    /// street de-duplication: half as many again, except for a limit of 1.
    pub fn fetch_limit(&self, limit: usize) -> usize {
        if self.dedupe_streets && limit > 1 {
            limit + limit.div_ceil(2)
        } else {
            limit
        }
    }

    pub const fn compiler(&self) -> QueryCompiler {
        QueryCompiler::new(self.field_weights, self.fuzziness)
    }

    /// Importance boost, plus distance decay when there is a center.
    pub fn scoring_policy(&self, center: Option<&Coordinate>) -> ScoringPolicy {
        let decay = center
            .map(|center| DistanceDecay::new(*center, self.decay_horizon_km, self.decay_floor));
        ScoringPolicy::new(ImportanceBoost::new(self.importance_factor), decay)
    }
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Create a builder for map-centric searches: proximity matters more and
    /// fades out sooner.
    pub fn local() -> Self {
        let mut builder = Self::new();
        builder.config.decay_horizon_km = 25.0;
        builder.config.decay_floor = 0.1;
        builder
    }

    /// Create a builder favouring well-known places over close lexical ties
    pub fn prominence() -> Self {
        let mut builder = Self::new();
        builder.config.importance_factor = 200.0;
        builder
    }

    /// Set the number of results returned when a request names no limit
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.config.default_limit = limit;
        self
    }

    /// Set the hard upper bound for requested limits
    pub fn max_limit(mut self, limit: usize) -> Self {
        self.config.max_limit = limit;
        self
    }

    pub fn importance_factor(mut self, factor: f64) -> Self {
        self.config.importance_factor = factor;
        self
    }

    /// Configure the distance decay applied when a request has a center
    pub fn distance_decay(mut self, horizon_km: f64, floor: f64) -> Self {
        self.config.decay_horizon_km = horizon_km;
        self.config.decay_floor = floor;
        self
    }

    /// Configure the typo tolerance requested from the index
    pub fn fuzziness(mut self, max_edits: u8, prefix_length: usize) -> Self {
        self.config.fuzziness = Fuzziness {
            max_edits,
            prefix_length,
        };
        self
    }

    pub fn index_timeout(mut self, timeout: Duration) -> Self {
        self.config.index_timeout = timeout;
        self
    }

    /// Enable or disable collapsing of street segments in results
    pub fn dedupe_streets(mut self, enabled: bool) -> Self {
        self.config.dedupe_streets = enabled;
        self
    }

    /// Configure field weights
    pub fn weights(self) -> WeightsBuilder {
        WeightsBuilder::new(self)
    }

    /// Validate and build the final configuration
    pub fn build(self) -> Result<SearchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder for field weights
pub struct WeightsBuilder {
    parent: SearchConfigBuilder,
}

impl WeightsBuilder {
    fn new(parent: SearchConfigBuilder) -> Self {
        Self { parent }
    }

    /// Widen the gap between name matches and everything else
    pub fn prioritize_names(mut self) -> Self {
        self.parent.config.field_weights = FieldWeights {
            name_exact: 10.0,
            name: 2.0,
            ..FieldWeights::default()
        };
        self
    }

    /// Narrow the gap between names and address parts
    pub fn prioritize_addresses(mut self) -> Self {
        self.parent.config.field_weights = FieldWeights {
            city: 0.8,
            street: 0.8,
            housenumber: 0.6,
            postcode: 0.5,
            ..FieldWeights::default()
        };
        self
    }

    /// Set custom weights (must keep the field ordering)
    pub fn custom_weights(mut self, weights: FieldWeights) -> Result<Self> {
        weights.validate()?;
        self.parent.config.field_weights = weights;
        Ok(self)
    }

    /// Return to the main configuration builder
    pub fn done(self) -> SearchConfigBuilder {
        self.parent
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum ConfigError {
        #[error("Invalid field weights: {0}")]
        InvalidWeights(String),
        #[error("Invalid scoring parameters: {0}")]
        InvalidScoring(String),
        #[error("Invalid limits: {0}")]
        InvalidLimit(String),
    }
    pub type Result<T> = std::result::Result<T, ConfigError>;
}
