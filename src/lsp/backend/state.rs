//! Backend state management
//!
//! This module defines the NavigatorBackend struct, which holds the open
//! documents, the engine for the workspace root and the file watcher.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use notify::RecommendedWatcher;
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;

use crate::completion::RankingMode;
use crate::config::ConfigOverrides;
use crate::navigator::Navigator;

/// Text of an open document
#[derive(Debug, Clone)]
pub(super) struct OpenDocument {
    pub(super) version: i32,
    pub(super) text: String,
}

/// Settings fixed when the server starts
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Project root; discovered from the client's workspace when absent
    pub root: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub ranking: RankingMode,
}

/// The language server backend
#[derive(Clone)]
pub struct NavigatorBackend {
    pub(super) client: Client,
    pub(super) options: Arc<BackendOptions>,
    pub(super) documents: Arc<DashMap<Url, OpenDocument>>,
    /// Engine for the workspace; `None` until a project root is found
    pub(super) navigator: Arc<RwLock<Option<Arc<Navigator>>>>,
    pub(super) file_watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
}

impl std::fmt::Debug for NavigatorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigatorBackend")
            .field("options", &self.options)
            .field("documents_count", &self.documents.len())
            .finish()
    }
}
