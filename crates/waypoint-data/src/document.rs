//! Place documents as stored in the search index.
//!
//! A [`Document`] is a single OpenStreetMap object (point of interest, street,
//! address or administrative area). Human-readable fields come in several
//! language variants and are held in a [`LocalizedText`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::locale::{Locale, LocaleKey};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    /// Parse a coordinate from raw request parameters.
    ///
    /// Both halves must be present and valid, otherwise there is no coordinate.
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> Option<Self> {
        let lat = lat?.trim().parse::<f64>().ok()?;
        let lon = lon?.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

/// Multilingual text keyed by [`LocaleKey`].
///
/// Keys from the source data that are neither a supported locale nor
/// `default` (alternative names such as `alt`, `old`, `int`, or unsupported
/// languages) are kept as alternates. They are searchable but never shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct LocalizedText {
    values: BTreeMap<LocaleKey, String>,
    alternates: BTreeMap<String, String>,
}

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text only available in the language-neutral variant.
    pub fn neutral(value: impl Into<String>) -> Self {
        Self::new().with(LocaleKey::Default, value)
    }

    pub fn with(mut self, key: impl Into<LocaleKey>, value: impl Into<String>) -> Self {
        self.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: LocaleKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    /// The value stored under `key`, if it is non-blank.
    pub fn get(&self, key: LocaleKey) -> Option<&str> {
        self.values
            .get(&key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// The value for `locale`, falling back to the `default` variant.
    pub fn localized(&self, locale: Locale) -> Option<&str> {
        self.get(LocaleKey::Locale(locale))
            .or_else(|| self.get(LocaleKey::Default))
    }

    /// Non-blank variants in key order.
    pub fn variants(&self) -> impl Iterator<Item = (LocaleKey, &str)> {
        LocaleKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|v| (key, v)))
    }

    pub fn alternates(&self) -> impl Iterator<Item = &str> {
        self.alternates
            .values()
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.variants().next().is_none() && self.alternates().next().is_none()
    }
}

impl From<BTreeMap<String, String>> for LocalizedText {
    fn from(raw: BTreeMap<String, String>) -> Self {
        let mut text = Self::default();
        for (key, value) in raw {
            match LocaleKey::parse(&key) {
                Some(locale_key) => text.insert(locale_key, value),
                None => {
                    text.alternates.insert(key, value);
                }
            }
        }
        text
    }
}

impl From<LocalizedText> for BTreeMap<String, String> {
    fn from(text: LocalizedText) -> Self {
        let mut raw = text.alternates;
        raw.extend(
            text.values
                .into_iter()
                .map(|(key, value)| (key.as_str().to_owned(), value)),
        );
        raw
    }
}

/// A place record as held by the index. Read-only from the search core's
/// point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub osm_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub housenumber: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub city: LocalizedText,
    #[serde(default)]
    pub country: LocalizedText,
    #[serde(default)]
    pub street: LocalizedText,
    #[serde(default)]
    pub context: LocalizedText,
    #[serde(default)]
    pub importance: f64,
}

impl Document {
    pub fn new(osm_id: i64, coordinate: Coordinate) -> Self {
        Self {
            osm_id,
            osm_key: None,
            osm_value: None,
            housenumber: None,
            postcode: None,
            coordinate,
            name: LocalizedText::default(),
            city: LocalizedText::default(),
            country: LocalizedText::default(),
            street: LocalizedText::default(),
            context: LocalizedText::default(),
            importance: 0.0,
        }
    }

    /// Importance clamped to a finite, non-negative value.
    pub fn importance(&self) -> f64 {
        if self.importance.is_finite() {
            self.importance.max(0.0)
        } else {
            0.0
        }
    }

    /// The housenumber, if present and non-blank.
    pub fn housenumber(&self) -> Option<&str> {
        self.housenumber
            .as_deref()
            .filter(|hn| !hn.trim().is_empty())
    }

    /// Whether the document carries a usable name in `locale` or `default`.
    pub fn is_named_in(&self, locale: Locale) -> bool {
        self.name.localized(locale).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(52.5, 13.4).is_some());
        assert!(Coordinate::new(91.0, 0.0).is_none());
        assert!(Coordinate::new(0.0, -180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_coordinate_parse() {
        assert_eq!(
            Coordinate::parse(Some("52.5"), Some(" 13.4")),
            Coordinate::new(52.5, 13.4)
        );
        assert!(Coordinate::parse(Some("52.5"), None).is_none());
        assert!(Coordinate::parse(Some("north"), Some("13.4")).is_none());
        assert!(Coordinate::parse(None, None).is_none());
    }

    #[test]
    fn test_distance_km() {
        let berlin = Coordinate::new(52.519854, 13.438596).unwrap();
        let potsdam = Coordinate::new(52.3879, 13.0582).unwrap();
        let d = berlin.distance_km(&potsdam);
        assert!((25.0..32.0).contains(&d), "unexpected distance {d}");
        assert!(berlin.distance_km(&berlin).abs() < 1e-9);
    }

    #[test]
    fn test_localized_fallback() {
        let text = LocalizedText::neutral("München").with(Locale::En, "Munich");
        assert_eq!(text.localized(Locale::En), Some("Munich"));
        assert_eq!(text.localized(Locale::De), Some("München"));

        let blank = LocalizedText::new().with(Locale::De, "  ");
        assert_eq!(blank.localized(Locale::De), None);
    }

    #[test]
    fn test_localized_text_keeps_alternates() {
        let text: LocalizedText =
            serde_json::from_str(r#"{"default": "Köln", "en": "Cologne", "old": "Cöln"}"#)
                .unwrap();
        assert_eq!(text.get(LocaleKey::Default), Some("Köln"));
        assert_eq!(text.localized(Locale::En), Some("Cologne"));
        assert_eq!(text.alternates().collect::<Vec<_>>(), vec!["Cöln"]);

        let back = serde_json::to_value(&text).unwrap();
        assert_eq!(back["old"], "Cöln");
        assert_eq!(back["en"], "Cologne");
    }

    #[test]
    fn test_document_deserialize_minimal() {
        let doc: Document = serde_json::from_str(
            r#"{"osm_id": 42, "coordinate": {"lat": 48.87, "lon": 2.34}, "housenumber": "25"}"#,
        )
        .unwrap();
        assert_eq!(doc.osm_id, 42);
        assert_eq!(doc.housenumber(), Some("25"));
        assert!(doc.name.is_empty());
        assert!(!doc.is_named_in(Locale::Fr));
        assert_eq!(doc.importance(), 0.0);
    }

    #[test]
    fn test_importance_clamped() {
        let mut doc = Document::new(1, Coordinate::new(0.0, 0.0).unwrap());
        doc.importance = -0.3;
        assert_eq!(doc.importance(), 0.0);
        doc.importance = f64::NAN;
        assert_eq!(doc.importance(), 0.0);
        doc.importance = 0.4;
        assert!((doc.importance() - 0.4).abs() < f64::EPSILON);
    }
}
