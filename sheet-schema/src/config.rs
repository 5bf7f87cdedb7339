//! Configuration for link suggestion and the HTTP service.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "bind_addr": "0.0.0.0:8080", "links": { "sample_size": 500 } }
//! ```

use std::path::Path;
use std::time::Duration;

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::sources::DecodeOptions;

/// Scores and limits used by the link suggestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Confidence of a fresh name-heuristic match (default: 0.5)
    pub base_confidence: f64,
    /// Added when both endpoints have the same semantic type (default: 0.2)
    pub type_match_boost: f64,
    /// Added when the overlap check passes (default: 0.2)
    pub overlap_boost: f64,
    /// Match rate that must be exceeded for the overlap boost (default: 0.7)
    pub overlap_threshold: f64,
    /// Source values sampled by the overlap check (default: 200)
    pub sample_size: usize,
    /// Per-suggestion time budget for the overlap check, in milliseconds
    /// (default: 10000)
    pub overlap_timeout_ms: u64,
    /// Cap confidence at 1.0 (default: true)
    pub clamp_confidence: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_confidence: 0.5,
            type_match_boost: 0.2,
            overlap_boost: 0.2,
            overlap_threshold: 0.7,
            sample_size: 200,
            overlap_timeout_ms: 10_000,
            clamp_confidence: true,
        }
    }
}

impl LinkConfig {
    pub fn with_base_confidence(mut self, confidence: f64) -> Self {
        self.base_confidence = confidence;
        self
    }

    pub fn with_type_match_boost(mut self, boost: f64) -> Self {
        self.type_match_boost = boost;
        self
    }

    pub fn with_overlap_boost(mut self, boost: f64) -> Self {
        self.overlap_boost = boost;
        self
    }

    pub fn with_overlap_threshold(mut self, threshold: f64) -> Self {
        self.overlap_threshold = threshold;
        self
    }

    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    pub fn with_overlap_timeout(mut self, timeout: Duration) -> Self {
        self.overlap_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_clamp_confidence(mut self, clamp: bool) -> Self {
        self.clamp_confidence = clamp;
        self
    }

    pub fn overlap_timeout(&self) -> Duration {
        Duration::from_millis(self.overlap_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("base_confidence", self.base_confidence),
            ("type_match_boost", self.type_match_boost),
            ("overlap_boost", self.overlap_boost),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SchemaError::Configuration(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(SchemaError::Configuration(format!(
                "overlap_threshold must be within [0, 1], got {}",
                self.overlap_threshold
            )));
        }
        if self.sample_size == 0 {
            return Err(SchemaError::Configuration(
                "sample_size must be positive".to_string(),
            ));
        }
        if self.overlap_timeout_ms == 0 {
            return Err(SchemaError::Configuration(
                "overlap_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the HTTP service and everything it drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the server listens on (default: 127.0.0.1:8000)
    pub bind_addr: String,
    /// Rows returned when an upload asks for a preview (default: 5)
    pub preview_rows: usize,
    /// Largest accepted request body in bytes (default: 32 MiB)
    pub max_upload_bytes: usize,
    /// Browser origins allowed to call the API (default: the local frontend
    /// on port 3000)
    pub allowed_origins: Vec<String>,
    pub links: LinkConfig,
    pub decode: DecodeOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            preview_rows: 5,
            max_upload_bytes: 32 * 1024 * 1024,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            links: LinkConfig::default(),
            decode: DecodeOptions::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            SchemaError::Configuration(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Allowed origins as header values.
    pub fn origin_headers(&self) -> Result<Vec<HeaderValue>> {
        self.allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| {
                    SchemaError::Configuration(format!("invalid allowed origin {origin:?}"))
                })
            })
            .collect()
    }

    pub fn with_links(mut self, links: LinkConfig) -> Self {
        self.links = links;
        self
    }

    pub fn with_decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(SchemaError::Configuration(
                "bind_addr cannot be empty".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(SchemaError::Configuration(
                "max_upload_bytes must be positive".to_string(),
            ));
        }
        if self.allowed_origins.iter().any(|o| o.trim() == "*") {
            return Err(SchemaError::Configuration(
                "allowed_origins cannot contain '*', list the origins explicitly".to_string(),
            ));
        }
        self.origin_headers()?;
        self.links.validate()?;
        self.decode.validate()
    }
}
