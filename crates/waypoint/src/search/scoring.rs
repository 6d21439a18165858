//! Score adjustments applied on top of the index's text relevance.
//!
//! `final = base × (1 + importance × K) × decay(distance)`
//!
//! Both factors are positive, so composing them never flips the sign of a
//! score. Negative inputs are clamped to zero.

use waypoint_data::Coordinate;

/// Exponent of the distance decay at the horizon: `decay(horizon) ≈ floor + (1 - floor)·e⁻⁵`.
const DECAY_RATE: f64 = 5.0;

/// Lifts prominent places (capitals, landmarks) above obscure lexical ties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportanceBoost {
    factor: f64,
}

impl ImportanceBoost {
    pub const fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub const fn factor(&self) -> f64 {
        self.factor
    }

    pub fn multiplier(&self, importance: f64) -> f64 {
        let importance = if importance.is_finite() {
            importance.max(0.0)
        } else {
            0.0
        };
        1.0 + importance * self.factor
    }
}

/// Favors documents close to a map center.
///
/// `decay(d) = floor + (1 - floor) · exp(-5 · d / horizon)`: exactly 1 at the
/// center, strictly decreasing with distance, and flattening towards `floor`
/// past the horizon so distant exact matches stay reachable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceDecay {
    center: Coordinate,
    horizon_km: f64,
    floor: f64,
}

impl DistanceDecay {
    pub const fn new(center: Coordinate, horizon_km: f64, floor: f64) -> Self {
        Self {
            center,
            horizon_km,
            floor,
        }
    }

    pub const fn center(&self) -> Coordinate {
        self.center
    }

    pub const fn horizon_km(&self) -> f64 {
        self.horizon_km
    }

    pub const fn floor(&self) -> f64 {
        self.floor
    }

    pub fn at_distance(&self, distance_km: f64) -> f64 {
        if distance_km.is_nan() {
            return self.floor;
        }
        let distance_km = distance_km.max(0.0);
        self.floor + (1.0 - self.floor) * (-DECAY_RATE * distance_km / self.horizon_km).exp()
    }

    pub fn multiplier(&self, coordinate: &Coordinate) -> f64 {
        self.at_distance(self.center.distance_km(coordinate))
    }
}

/// Importance boost plus optional distance decay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    importance: ImportanceBoost,
    decay: Option<DistanceDecay>,
}

impl ScoringPolicy {
    pub const fn new(importance: ImportanceBoost, decay: Option<DistanceDecay>) -> Self {
        Self { importance, decay }
    }

    pub const fn importance(&self) -> &ImportanceBoost {
        &self.importance
    }

    pub const fn decay(&self) -> Option<&DistanceDecay> {
        self.decay.as_ref()
    }

    /// Final score for a document. A missing coordinate under an active decay
    /// scores as if it were beyond the horizon.
    pub fn score(&self, base: f64, importance: f64, coordinate: Option<&Coordinate>) -> f64 {
        let base = if base.is_finite() { base.max(0.0) } else { 0.0 };
        let boosted = base * self.importance.multiplier(importance);
        match (&self.decay, coordinate) {
            (Some(decay), Some(coordinate)) => boosted * decay.multiplier(coordinate),
            (Some(decay), None) => boosted * decay.floor(),
            (None, _) => boosted,
        }
    }
}
