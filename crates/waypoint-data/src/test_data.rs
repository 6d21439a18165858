//! A small, hand-made set of documents for tests, doc examples and demos.
//!
//! The set covers the cases the search core has to get right: prominent
//! cities with localized names, unnamed address records, a street split into
//! two segments sharing a postcode, and two equally named stations far apart.

use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    document::{Coordinate, Document, LocalizedText},
    dump::write_documents,
    error::Result,
    locale::Locale,
};

pub const BERLIN_ID: i64 = 240_109_189;
pub const PARIS_ID: i64 = 7_444;
pub const RUE_BERGERE_25_ID: i64 = 3_121_640_117;
pub const RUE_BERGERE_27_ID: i64 = 3_121_640_118;
pub const RUE_BERGERE_STREET_IDS: [i64; 2] = [23_816_502, 23_816_503];
pub const BERGMANNSTRASSE_5_ID: i64 = 2_894_115_306;
pub const BERLIN_HBF_ID: i64 = 1_097_196_050;
pub const MUNICH_HBF_ID: i64 = 1_097_196_051;

fn point(lat: f64, lon: f64) -> Coordinate {
    Coordinate { lat, lon }
}

fn germany() -> LocalizedText {
    LocalizedText::neutral("Deutschland")
        .with(Locale::De, "Deutschland")
        .with(Locale::En, "Germany")
        .with(Locale::Fr, "Allemagne")
        .with(Locale::It, "Germania")
}

fn france() -> LocalizedText {
    LocalizedText::neutral("France")
        .with(Locale::De, "Frankreich")
        .with(Locale::En, "France")
        .with(Locale::It, "Francia")
}

fn rue_bergere_address(osm_id: i64, housenumber: &str, lon: f64) -> Document {
    Document {
        osm_key: Some("place".into()),
        osm_value: Some("house".into()),
        housenumber: Some(housenumber.into()),
        postcode: Some("75009".into()),
        street: LocalizedText::neutral("Rue Bergère"),
        city: LocalizedText::neutral("Paris").with(Locale::It, "Parigi"),
        country: france(),
        ..Document::new(osm_id, point(48.87204, lon))
    }
}

fn rue_bergere_segment(osm_id: i64, lon: f64) -> Document {
    Document {
        osm_key: Some("highway".into()),
        osm_value: Some("residential".into()),
        postcode: Some("75009".into()),
        name: LocalizedText::neutral("Rue Bergère"),
        city: LocalizedText::neutral("Paris").with(Locale::It, "Parigi"),
        country: france(),
        importance: 0.05,
        ..Document::new(osm_id, point(48.87195, lon))
    }
}

fn hauptbahnhof(osm_id: i64, coordinate: Coordinate, city: &str) -> Document {
    Document {
        osm_key: Some("railway".into()),
        osm_value: Some("station".into()),
        name: LocalizedText::neutral("Hauptbahnhof"),
        city: LocalizedText::neutral(city),
        country: germany(),
        importance: 0.3,
        ..Document::new(osm_id, coordinate)
    }
}

/// The fixture documents, in no particular order.
pub fn sample_documents() -> Vec<Document> {
    vec![
        Document {
            osm_key: Some("place".into()),
            osm_value: Some("city".into()),
            postcode: Some("10117".into()),
            name: LocalizedText::neutral("Berlin")
                .with(Locale::De, "Berlin")
                .with(Locale::En, "Berlin")
                .with(Locale::Fr, "Berlin")
                .with(Locale::It, "Berlino"),
            country: germany(),
            importance: 0.85,
            ..Document::new(BERLIN_ID, point(52.5170365, 13.3888599))
        },
        Document {
            osm_key: Some("place".into()),
            osm_value: Some("city".into()),
            name: LocalizedText::neutral("Paris")
                .with(Locale::It, "Parigi")
                .with(Locale::De, "Paris"),
            country: france(),
            importance: 0.85,
            ..Document::new(PARIS_ID, point(48.8566, 2.3515))
        },
        rue_bergere_address(RUE_BERGERE_25_ID, "25", 2.34497),
        rue_bergere_address(RUE_BERGERE_27_ID, "27", 2.34512),
        rue_bergere_segment(RUE_BERGERE_STREET_IDS[0], 2.34470),
        rue_bergere_segment(RUE_BERGERE_STREET_IDS[1], 2.34620),
        Document {
            osm_key: Some("place".into()),
            osm_value: Some("house".into()),
            housenumber: Some("5".into()),
            postcode: Some("10961".into()),
            street: LocalizedText::neutral("Bergmannstraße"),
            city: LocalizedText::neutral("Berlin").with(Locale::It, "Berlino"),
            country: germany(),
            ..Document::new(BERGMANNSTRASSE_5_ID, point(52.48918, 13.39502))
        },
        hauptbahnhof(BERLIN_HBF_ID, point(52.5250839, 13.369402), "Berlin"),
        hauptbahnhof(MUNICH_HBF_ID, point(48.1402669, 11.5600980), "München"),
    ]
}

/// Write the fixture documents to a temporary JSON-lines dump.
pub fn create_test_dump() -> Result<NamedTempFile> {
    let documents = sample_documents();
    let file = NamedTempFile::new()?;
    let written = write_documents(file.path(), &documents)?;
    info!(num_documents = written, path = ?file.path(), "Created test document dump");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_ids_are_unique() {
        let docs = sample_documents();
        let mut ids: Vec<_> = docs.iter().map(|d| d.osm_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), docs.len());
    }

    #[test]
    fn test_addresses_are_unnamed() {
        let docs = sample_documents();
        let address = docs
            .iter()
            .find(|d| d.osm_id == RUE_BERGERE_25_ID)
            .unwrap();
        assert!(address.name.is_empty());
        assert_eq!(address.housenumber(), Some("25"));
    }

    #[test]
    fn test_create_test_dump() {
        let file = create_test_dump().unwrap();
        let docs = crate::dump::read_documents(file.path()).unwrap();
        assert_eq!(docs.len(), sample_documents().len());
    }
}
