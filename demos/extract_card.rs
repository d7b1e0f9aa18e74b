//! End-to-end extraction: read a card image, send it through the active
//! endpoint, print the recovered contact fields.
//!
//! Usage: cargo run --example extract_card -- path/to/card.jpg

use cardscan::{CardScanner, EndpointRegistry, ExtractionRequest};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: extract_card <image path>")?;
    let image = std::fs::read(&path)?;

    let registry = Arc::new(EndpointRegistry::load("api_endpoints.json")?);
    let scanner = CardScanner::new(registry);

    if !scanner.health().await {
        eprintln!("warning: OCR endpoint did not answer the liveness probe");
    }

    let details = scanner.extract(&ExtractionRequest::new(image)).await?;
    println!("{}", details.to_json());

    Ok(())
}
