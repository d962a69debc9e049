use std::sync::Mutex;

use pixtree_types::ImageNode;
use tempfile::TempDir;

use crate::backend::{BackendError, GenerationBackend, GenerationOutput, GenerationRequest};
use crate::options::GenerateOptions;
use crate::repository::Pixtree;

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 7, 7, 7];

pub fn workspace() -> (TempDir, Pixtree) {
    let dir = tempfile::tempdir().unwrap();
    let px = Pixtree::init(dir.path(), "test").unwrap();
    (dir, px)
}

/// Generate in the current context; the image bytes are the prompt itself.
pub fn generate(px: &Pixtree, prompt: &str) -> ImageNode {
    px.generate(
        GenerateOptions::new(prompt),
        &StaticBackend::new(prompt.as_bytes()),
    )
    .unwrap()
}

/// Returns fixed bytes and echoes the requested config.
pub struct StaticBackend {
    bytes: Vec<u8>,
    last: Mutex<Option<GenerationRequest>>,
}

impl StaticBackend {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            last: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().unwrap().clone()
    }
}

impl GenerationBackend for StaticBackend {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, BackendError> {
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(GenerationOutput {
            image_bytes: self.bytes.clone(),
            parameters: request.config.clone(),
            duration_secs: 1.5,
            dimensions: None,
        })
    }
}

pub struct FailingBackend(pub String);

impl GenerationBackend for FailingBackend {
    fn generate(&self, _request: &GenerationRequest) -> Result<GenerationOutput, BackendError> {
        Err(BackendError::new(self.0.clone()))
    }
}
