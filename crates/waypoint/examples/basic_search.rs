//! Basic place search functionality
//!
//! This example demonstrates the fundamental search operations:
//! - Creating a searcher over the bundled fixture documents
//! - Searches in different languages, with and without a map center
//! - Printing results as GeoJSON

use waypoint::{Coordinate, FeatureCollection, PlaceSearcher, SearchConfigBuilder, SearchRequest, data::test_data};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    waypoint::init_logging(tracing::Level::INFO)?;

    let searcher = PlaceSearcher::in_memory(&test_data::sample_documents())?;

    println!("Searching for 'berlin':");
    let results = searcher.search(&SearchRequest::new("berlin")).await?;
    print_results(&results, 3);

    println!("\nSearching for '25 rue bergère paris' in French:");
    let request = SearchRequest::new("25 rue bergère paris").with_language("fr");
    print_results(&searcher.search(&request).await?, 3);

    println!("\nSearching for 'hauptbahnhof' near Munich (local preset):");
    let config = SearchConfigBuilder::local().default_limit(5).build()?;
    let local = searcher.clone().with_config(config);
    let munich = Coordinate::new(48.14, 11.58).ok_or("invalid coordinate")?;
    let request = SearchRequest::new("hauptbahnhof")
        .with_language("de")
        .with_center(munich);
    let outcome = local.search_with_outcome(&request).await?;
    println!("  ({:?} attempt, {} index calls)", outcome.attempt, outcome.attempts_issued);
    print_results(&outcome.features, 3);

    println!("\nGeoJSON for 'paris':");
    let results = searcher.search(&SearchRequest::new("paris").with_limit(1)).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);

    Ok(())
}

fn print_results(results: &FeatureCollection, limit: usize) {
    for (i, feature) in results.iter().take(limit).enumerate() {
        let properties = &feature.properties;
        println!(
            "  {}. {} ({}) - {}, {} @ {:.4},{:.4}",
            i + 1,
            properties.name.as_deref().unwrap_or("Unknown"),
            properties.osm_value.as_deref().unwrap_or("-"),
            properties.city.as_deref().unwrap_or("-"),
            properties.country.as_deref().unwrap_or("-"),
            feature.geometry.lat(),
            feature.geometry.lon(),
        );
    }

    if results.len() > limit {
        println!("  ... and {} more", results.len() - limit);
    }
    if results.is_empty() {
        println!("  No results");
    }
}
