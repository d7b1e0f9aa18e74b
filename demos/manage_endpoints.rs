//! Endpoint registry lifecycle: add, activate, list, remove.
//!
//! Usage: cargo run --example manage_endpoints

use cardscan::{EndpointConfig, EndpointRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let registry = EndpointRegistry::load("api_endpoints.json")?;

    registry.add(
        EndpointConfig::new("local", "http://localhost:8000/api/ocr")
            .with_timeout(15)
            .with_description("Local OCR endpoint for development"),
    )?;
    registry.set_active("local")?;

    println!("registered endpoints:");
    for row in registry.list() {
        let marker = if row.active { "*" } else { " " };
        println!(
            "  {marker} {:<12} {:<40} timeout={}s {}",
            row.name, row.url, row.timeout, row.description
        );
    }

    registry.remove("local")?;
    println!("after removal, active = {}", registry.active_name());

    Ok(())
}
