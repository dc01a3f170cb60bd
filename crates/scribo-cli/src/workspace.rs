use std::path::{Path, PathBuf};
use std::sync::Arc;

use scribo_analyze::{Analyzer, HttpAnalyzer, LlmAnalyzer, Session};
use scribo_core::{AiSettings, AnalysisCache, FileStore, Store};

/// Resolved data directory plus the store that lives in it.
pub struct Workspace {
    data_dir: PathBuf,
    store: Arc<FileStore>,
}

impl Workspace {
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir.unwrap_or_else(scribo_core::data_dir);
        let store = Arc::new(FileStore::new(scribo_core::store_dir(&data_dir)));
        Self { data_dir, store }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings(&self) -> AiSettings {
        scribo_core::read_settings(&self.data_dir)
    }

    pub fn cache(&self) -> AnalysisCache {
        AnalysisCache::new(self.store())
    }

    pub fn open_session(&self) -> Session {
        Session::open(self.store(), analyzer_for(self.settings()))
    }

    fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }
}

/// Remote endpoint when one is configured, otherwise the in-process model call.
fn analyzer_for(settings: AiSettings) -> Arc<dyn Analyzer> {
    match settings.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(endpoint) => {
            tracing::debug!(endpoint, "using remote analyzer");
            Arc::new(HttpAnalyzer::new(endpoint))
        }
        None => Arc::new(LlmAnalyzer::new(settings)),
    }
}
