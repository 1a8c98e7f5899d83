//! Machine-readable response wrapper shared by every CLI command.
//!
//! ```json
//! {
//!   "meta": { "request_id": "…", "schema_version": "v1.0.0", "degraded": true, … },
//!   "data": { … },
//!   "errors": [{ "code": "source.timeout", "message": "…", "retryable": true, "source": "coingecko" }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::{ProviderId, SourceError, UtcDateTime, ValidationError};

pub const SCHEMA_VERSION: &str = "v1.0.0";

const MIN_REQUEST_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn new(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: impl IntoIterator<Item = EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    /// Providers consulted, in order; `synthetic` last when the fallback ran.
    pub source_chain: Vec<ProviderId>,
    pub latency_ms: u64,
    /// Set when any part of `data` was synthesized instead of fetched.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        source_chain: Vec<ProviderId>,
    ) -> Result<Self, ValidationError> {
        let request_id = request_id.into();
        if request_id.trim().len() < MIN_REQUEST_ID_LEN {
            return Err(ValidationError::InvalidRequestId);
        }
        if source_chain.is_empty() {
            return Err(ValidationError::EmptySourceChain);
        }

        Ok(Self {
            request_id,
            schema_version: String::from(SCHEMA_VERSION),
            generated_at: UtcDateTime::now(),
            source_chain,
            latency_ms: 0,
            degraded: false,
            warnings: Vec::new(),
        })
    }

    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        Self { latency_ms, ..self }
    }

    pub fn with_degraded(self, degraded: bool) -> Self {
        Self { degraded, ..self }
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

/// A source failure behind a degraded response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    pub source: ProviderId,
}

impl EnvelopeError {
    pub fn from_source_error(error: &SourceError, source: ProviderId) -> Self {
        Self {
            code: error.code().to_owned(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
            source,
        }
    }
}
