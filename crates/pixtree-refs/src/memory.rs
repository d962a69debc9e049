//! In-memory context store for tests.

use std::sync::RwLock;

use crate::context::WorkspaceContext;
use crate::error::Result;
use crate::traits::ContextStore;

#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    context: RwLock<Option<WorkspaceContext>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for InMemoryContextStore {
    fn load(&self) -> Result<WorkspaceContext> {
        let context = self.context.read().expect("lock poisoned");
        Ok(context.clone().unwrap_or_default())
    }

    fn save(&self, context: &WorkspaceContext) -> Result<()> {
        *self.context.write().expect("lock poisoned") = Some(context.clone());
        Ok(())
    }
}
