use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fixed instruction sent alongside every card image.
///
/// The endpoint keys off this text to decide which fields to extract; the
/// wording is part of the wire contract and should not be changed casually.
pub const DEFAULT_EXTRACTION_QUERY: &str = "I am providing business cards. I want JSON output \
     with keys like name, company name, mobile number, email, and address in a structured format.";

/// A single extraction request: image bytes plus the instruction text.
///
/// Immutable once constructed; build a new one per call.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Raw image bytes, already encoded (JPEG expected by the endpoint).
    pub image: Vec<u8>,
    /// Content type label for the multipart image part.
    pub content_type: String,
    /// File name label for the multipart image part.
    pub file_name: String,
    /// Natural-language extraction instruction.
    pub query: String,
}

impl ExtractionRequest {
    /// Create a request for the given image bytes with the standard
    /// instruction and `image/jpeg` labeling.
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            content_type: "image/jpeg".to_string(),
            file_name: "business_card.jpg".to_string(),
            query: DEFAULT_EXTRACTION_QUERY.to_string(),
        }
    }

    /// Replace the extraction instruction.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Replace the content type and file name labels.
    pub fn with_content_type(mut self, content_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self.file_name = file_name.into();
        self
    }
}

/// Contact fields recovered from a business card.
///
/// Every field is optional: an absent field means the endpoint did not find
/// it, which is a valid outcome, not an error. A result with every field
/// `None` is "nothing recognized", distinct from any extraction failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardDetails {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub company: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub confidence: Option<f64>,
    /// Measured round-trip time in seconds. Set by the mapper from the
    /// facade's timer, never taken from the response body.
    pub processing_time: Option<f64>,
    /// Full decoded response object, kept for diagnostics. Not serialized.
    #[serde(skip)]
    pub raw_response: Map<String, Value>,
}

impl CardDetails {
    /// Pretty-printed JSON rendering of the contact fields.
    ///
    /// `raw_response` is excluded; it is diagnostic payload only.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
