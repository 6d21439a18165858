//! Turning index documents into localized GeoJSON features.
//!
//! Multilingual fields are reduced to one string in the requested locale,
//! falling back to the language-neutral variant. Address records without a
//! name get one synthesized from housenumber and street in the order that
//! locale writes addresses.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::trace;
use waypoint_data::{Document, Locale};

/// `osm_key` of street segments, candidates for de-duplication.
const STREET_OSM_KEY: &str = "highway";

/// A GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Keep at most the first `len` features.
    pub fn truncate(&mut self, len: usize) {
        self.features.truncate(len);
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// One result as a GeoJSON `Feature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Point,
    pub properties: Properties,
}

/// A GeoJSON `Point`. Coordinates are `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Point")]
pub struct Point {
    pub coordinates: [f64; 2],
}

impl Point {
    pub const fn lon(&self) -> f64 {
        self.coordinates[0]
    }

    pub const fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Flat, localized feature properties. Absent values are left out of the
/// serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    pub osm_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub housenumber: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_owned)
}

/// Localizes documents for one request.
#[derive(Debug, Clone, Copy)]
pub struct ResultLocalizer {
    locale: Locale,
    dedupe_streets: bool,
}

impl ResultLocalizer {
    pub const fn new(locale: Locale, dedupe_streets: bool) -> Self {
        Self {
            locale,
            dedupe_streets,
        }
    }

    pub fn localize(&self, document: &Document) -> Feature {
        let locale = self.locale;
        let mut properties = Properties {
            osm_id: document.osm_id,
            osm_key: non_blank(document.osm_key.as_deref()),
            osm_value: non_blank(document.osm_value.as_deref()),
            postcode: non_blank(document.postcode.as_deref()),
            housenumber: non_blank(document.housenumber()),
            name: non_blank(document.name.localized(locale)),
            city: non_blank(document.city.localized(locale)),
            country: non_blank(document.country.localized(locale)),
            street: non_blank(document.street.localized(locale)),
        };

        if properties.name.is_none()
            && let Some(housenumber) = &properties.housenumber
        {
            properties.name = Some(match &properties.street {
                None => housenumber.clone(),
                Some(street) if locale.housenumber_first() => format!("{housenumber} {street}"),
                Some(street) => format!("{street} {housenumber}"),
            });
        }

        Feature {
            geometry: Point {
                coordinates: [document.coordinate.lon, document.coordinate.lat],
            },
            properties,
        }
    }

    /// Localize documents in order. Records that end up with neither a name
    /// nor a housenumber are dropped, as are repeated street segments when
    /// de-duplication is enabled.
    pub fn localize_all<'a>(&self, documents: impl IntoIterator<Item = &'a Document>) -> FeatureCollection {
        let mut seen_streets = AHashSet::new();
        let features = documents
            .into_iter()
            .map(|document| self.localize(document))
            .filter(|feature| {
                // A synthesized name implies a housenumber
                let named = feature.properties.name.is_some();
                if !named {
                    trace!(osm_id = feature.properties.osm_id, "Dropping unnamed record");
                }
                named
            })
            .filter(|feature| {
                if !self.dedupe_streets {
                    return true;
                }
                let Some(key) = street_key(&feature.properties) else {
                    return true;
                };
                let first = seen_streets.insert(key);
                if !first {
                    trace!(osm_id = feature.properties.osm_id, "Dropping duplicate street segment");
                }
                first
            })
            .collect();
        FeatureCollection { features }
    }
}

/// `postcode:name` for named street segments with a postcode.
fn street_key(properties: &Properties) -> Option<String> {
    if properties.osm_key.as_deref() != Some(STREET_OSM_KEY) {
        return None;
    }
    let postcode = properties.postcode.as_deref()?;
    let name = properties.name.as_deref()?;
    Some(format!("{postcode}:{name}"))
}
