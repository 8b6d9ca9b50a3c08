//! Basic usage example for the image-finder library.
//!
//! Builds the provider registry from configuration (file, environment and
//! defaults), then runs the same query in both aggregation modes.
//!
//! ```text
//! GIPHY_API_KEY=... cargo run --example basic_usage -- "distracted boyfriend"
//! ```

use image_finder::config::load_config;
use image_finder::{Aggregator, ProviderRegistry, SearchMode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "distracted boyfriend".to_string());

    let config = load_config(None)?;
    let registry = ProviderRegistry::from_config(&config);

    println!("Initialized {} providers", registry.len());
    println!("Order: {}\n", registry.ids().collect::<Vec<_>>().join(", "));

    for mode in [SearchMode::FirstSuccess, SearchMode::Concatenate] {
        let aggregator = Aggregator::from_config(&config, &registry).with_mode(mode);
        let result = aggregator.search(&query, 6).await;

        println!("== {} ==", mode);
        if result.is_enhanced() {
            println!("Searching for: {}", result.enhanced_query);
        }

        if let Some(error) = &result.error {
            eprintln!("  Error: {}", error);
            continue;
        }
        if result.is_empty() {
            println!("  No results");
            continue;
        }

        for (i, image) in result.results.iter().enumerate() {
            println!("{}. [{}] {}", i + 1, image.provider, image.title);
            println!("   {}", image.image_url);
        }
        println!();
    }

    Ok(())
}
