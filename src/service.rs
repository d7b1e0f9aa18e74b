//! Facade composing transport, normalization and field mapping.

use crate::client::{self, TransportError};
use crate::mapper;
use crate::normalizer::{self, ParseError};
use crate::registry::{EndpointConfig, EndpointRegistry};
use crate::types::{CardDetails, ExtractionRequest};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// The only error type crossing the facade boundary.
///
/// Transient faults are retried inside the transport and never surface
/// individually; whatever arrives here is final for the call.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed endpoint response: {0}")]
    MalformedResponse(#[from] ParseError),
}

/// Business-card extraction service bound to an endpoint registry.
///
/// # Example
/// ```no_run
/// use cardscan::{CardScanner, EndpointRegistry, ExtractionRequest};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(EndpointRegistry::load("api_endpoints.json")?);
/// let scanner = CardScanner::new(registry);
///
/// let image = std::fs::read("card.jpg")?;
/// let details = scanner.extract(&ExtractionRequest::new(image)).await?;
/// println!("{}", details.to_json());
/// # Ok(())
/// # }
/// ```
pub struct CardScanner {
    http: Client,
    registry: Arc<EndpointRegistry>,
}

impl CardScanner {
    /// Create a scanner using the given registry and a default HTTP client.
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self {
            http: Client::new(),
            registry,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// The registry this scanner reads its active endpoint from.
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Extract contact fields from a card image via the active endpoint.
    ///
    /// A successful result with every field absent means the endpoint
    /// recognized nothing; that is a valid outcome, not an error.
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<CardDetails, ServiceError> {
        let config = self.registry.active();
        self.extract_with(&config, request).await
    }

    /// Extract using an explicit endpoint configuration.
    pub async fn extract_with(
        &self,
        config: &EndpointConfig,
        request: &ExtractionRequest,
    ) -> Result<CardDetails, ServiceError> {
        let started = Instant::now();
        info!(url = %config.url, bytes = request.image.len(), "sending OCR request");

        let raw = client::send(&self.http, config, request).await?;
        let elapsed = started.elapsed().as_secs_f64();
        info!(elapsed_seconds = elapsed, "OCR response received");

        let object = normalizer::normalize(&raw)?;
        let details = mapper::map_fields(object, elapsed);
        info!(
            name = details.name.as_deref().unwrap_or("-"),
            company = details.company.as_deref().unwrap_or("-"),
            "extraction completed"
        );
        Ok(details)
    }

    /// Liveness probe against the active endpoint.
    ///
    /// Reports whether the endpoint is reachable at all, which is a weaker
    /// claim than it producing a usable extraction.
    pub async fn health(&self) -> bool {
        let config = self.registry.active();
        client::probe(&self.http, &config).await
    }
}
