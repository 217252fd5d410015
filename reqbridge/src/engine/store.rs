//! Cache of prepared documents, keyed by locator.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::core::locator::ResourceLocator;
use crate::engine::script::ScriptSnippet;

/// A document after the region parsers have seen it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpDocument {
    pub locator: ResourceLocator,
    pub text: String,
    /// `@note` confirmations collected by the note parser.
    pub notes: Vec<String>,
    /// Scripts contributed by script-driven parsers, in pipeline order.
    pub region_scripts: Vec<ScriptSnippet>,
}

impl HttpDocument {
    pub fn new(locator: ResourceLocator, text: String) -> Self {
        Self {
            locator,
            text,
            notes: Vec::new(),
            region_scripts: Vec::new(),
        }
    }
}

#[derive(Default)]
struct StoreState {
    documents: HashMap<ResourceLocator, Arc<HttpDocument>>,
    /// Bumped on every clear so preparations that started earlier are dropped.
    generation: u64,
}

#[derive(Default)]
pub struct DocumentStore {
    state: Mutex<StoreState>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, locator: &ResourceLocator) -> Option<Arc<HttpDocument>> {
        self.state.lock().await.documents.get(locator).cloned()
    }

    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    /// Cache `doc` unless the store was cleared after `generation` was read.
    /// Returns whether the document was stored.
    pub async fn insert_if_current(&self, doc: Arc<HttpDocument>, generation: u64) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            return false;
        }
        state.documents.insert(doc.locator.clone(), doc);
        true
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.documents.clear();
        state.generation += 1;
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::file_locator;

    fn doc(path: &str) -> Arc<HttpDocument> {
        Arc::new(HttpDocument::new(file_locator(path), "GET /".to_string()))
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = DocumentStore::new();
        let generation = store.generation().await;
        assert!(store.insert_if_current(doc("/ws/a.http"), generation).await);
        assert!(store.get(&file_locator("/ws/a.http")).await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn clear_drops_documents_and_stale_inserts() {
        let store = DocumentStore::new();
        let generation = store.generation().await;
        store.insert_if_current(doc("/ws/a.http"), generation).await;

        store.clear().await;
        assert!(store.is_empty().await);
        assert!(!store.insert_if_current(doc("/ws/b.http"), generation).await);
        assert!(store.get(&file_locator("/ws/b.http")).await.is_none());
    }
}
