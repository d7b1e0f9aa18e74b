//! # cardscan
//!
//! Resilient client for a loosely-specified business-card OCR endpoint.
//!
//! ## Features
//!
//! - **Retrying transport** — multipart image upload with per-attempt
//!   timeout, bounded retries for transient statuses (429, 500, 502, 503,
//!   504) and connection failures, and exponential backoff
//! - **Lenient response normalization** — a 7-step recovery chain that
//!   extracts a single JSON object from replies that are double-encoded,
//!   quote-wrapped, concatenated, or full of escaped characters
//! - **Canonical field mapping** — alias-aware mapping (`company` /
//!   `company_name`, `mobile` / `phone`) onto a typed [`CardDetails`] record
//! - **Named endpoint registry** — mutex-guarded, JSON-persisted endpoint
//!   configurations with one active entry and a reserved `default`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardscan::{CardScanner, EndpointRegistry, ExtractionRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(EndpointRegistry::load("api_endpoints.json")?);
//!     let scanner = CardScanner::new(registry);
//!
//!     let image = std::fs::read("business_card.jpg")?;
//!     let details = scanner.extract(&ExtractionRequest::new(image)).await?;
//!
//!     println!("name:    {:?}", details.name);
//!     println!("company: {:?}", details.company);
//!     println!("email:   {:?}", details.email);
//!     Ok(())
//! }
//! ```
//!
//! ## Normalization robustness
//!
//! The endpoint's output format is not contractually stable; [`normalize`]
//! recovers from every malformation observed in the wild:
//!
//! ```rust
//! use cardscan::normalize;
//!
//! // Clean JSON passes through
//! assert!(normalize(r#"{"name":"Ada"}"#).is_ok());
//!
//! // Several concatenated objects: the first one wins
//! assert_eq!(normalize(r#"{"name":"A"}{"name":"B"}"#).unwrap()["name"], "A");
//!
//! // Double-encoded, escaped, with a trailing period
//! assert_eq!(normalize("\"{\\\"name\\\":\\\"A\\\"}\".").unwrap()["name"], "A");
//!
//! // Prose with an object buried inside
//! assert!(normalize(r#"Here you go: {"name":"Ada"}"#).is_ok());
//!
//! // No structure at all: a typed failure, never a guess
//! assert!(normalize("not json at all").is_err());
//! ```

pub mod client;
pub mod mapper;
pub mod normalizer;
pub mod registry;
pub mod service;
pub mod types;

// Re-export main types at crate root
pub use client::TransportError;
pub use mapper::map_fields;
pub use normalizer::{normalize, ParseError};
pub use registry::{
    EndpointConfig, EndpointRegistry, EndpointSummary, RegistryError, DEFAULT_ENDPOINT,
};
pub use service::{CardScanner, ServiceError};
pub use types::{CardDetails, ExtractionRequest, DEFAULT_EXTRACTION_QUERY};
