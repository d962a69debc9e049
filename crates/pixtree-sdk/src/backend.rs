//! Contracts for the external generation and analysis services.
//!
//! pixtree never talks to a model directly. Callers hand it a backend that
//! turns a [`GenerationRequest`] into image bytes, and optionally one that
//! describes an image. Failures are opaque strings and are never retried.

use std::path::PathBuf;

use pixtree_types::{Dimensions, ImageAnalysis, ModelConfig};
use thiserror::Error;

/// Opaque failure reported by a backend (quota, auth, bad request, ...).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub config: ModelConfig,
    /// Bytes of the parent image when refining an existing node.
    pub source_image: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationOutput {
    pub image_bytes: Vec<u8>,
    /// Parameters the backend actually used; may differ from the request.
    pub parameters: ModelConfig,
    pub duration_secs: f64,
    pub dimensions: Option<Dimensions>,
}

pub trait GenerationBackend {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, BackendError>;
}

pub trait AnalysisBackend {
    fn analyze(&self, image: &[u8]) -> Result<ImageAnalysis, BackendError>;
}

/// Backend for images produced outside pixtree: "generating" reads the
/// result from a file and records the request parameters unchanged.
#[derive(Clone, Debug)]
pub struct FileBackend {
    path: PathBuf,
    dimensions: Option<Dimensions>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

impl GenerationBackend for FileBackend {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, BackendError> {
        let image_bytes = std::fs::read(&self.path)
            .map_err(|e| BackendError(format!("{}: {e}", self.path.display())))?;
        Ok(GenerationOutput {
            image_bytes,
            parameters: request.config.clone(),
            duration_secs: 0.0,
            dimensions: self.dimensions,
        })
    }
}
