//! LSP backend: document tracking, engine lifecycle and source watching
//!
//! Engine calls are synchronous and may touch the filesystem or run the
//! route query, so every one of them goes through
//! [`tokio::task::spawn_blocking`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;

use dashmap::DashMap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::task;
use tower_lsp::Client;
use tower_lsp::lsp_types::MessageType;
use tracing::{debug, info, warn};

use crate::config::Project;
use crate::navigator::Navigator;
use crate::symbols::Category;

mod handlers;
mod state;
mod utils;

pub use state::{BackendOptions, NavigatorBackend};

/// Workspace command creating the file for an unresolved view
pub const CREATE_VIEW_COMMAND: &str = "laravelNavigator.createView";

impl NavigatorBackend {
    pub fn new(client: Client, options: BackendOptions) -> Self {
        Self {
            client,
            options: Arc::new(options),
            documents: Arc::new(DashMap::new()),
            navigator: Arc::new(RwLock::new(None)),
            file_watcher: Arc::new(Mutex::new(None)),
        }
    }

    pub(super) async fn navigator(&self) -> Option<Arc<Navigator>> {
        self.navigator.read().await.clone()
    }

    /// Open the project containing `start`, replacing any previous engine
    pub(super) async fn open_project(&self, start: PathBuf) -> Option<PathBuf> {
        let overrides = self.options.overrides.clone();
        let opened = task::spawn_blocking(move || Project::open_with(&start, &overrides)).await;

        match opened {
            Ok(Ok(project)) => {
                let root = project.root().to_path_buf();
                *self.navigator.write().await = Some(Arc::new(Navigator::new(project)));
                Some(root)
            }
            Ok(Err(e)) => {
                warn!("No project opened: {}", e);
                if e.is_user_visible() {
                    self.client.show_message(MessageType::WARNING, format!("Laravel navigator: {}", e)).await;
                }
                None
            }
            Err(e) => {
                warn!("Project discovery task failed: {}", e);
                None
            }
        }
    }

    /// Run `f` against the engine on the blocking pool
    pub(super) async fn with_engine<T, F>(&self, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&Navigator) -> T + Send + 'static,
    {
        let navigator = self.navigator().await?;
        match task::spawn_blocking(move || f(&navigator)).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Engine task failed: {}", e);
                None
            }
        }
    }

    /// Show the pending extraction failure for `category`, if it is one the
    /// user should see
    pub(super) async fn report_failure(&self, category: Category) {
        let Some(navigator) = self.navigator().await else {
            return;
        };
        if let Some(e) = navigator.take_failure(category) {
            if e.is_user_visible() {
                self.client
                    .show_message(MessageType::WARNING, format!("Could not load {} symbols: {}", category, e))
                    .await;
            }
        }
    }

    /// Extract routes in the background so the first completion is fast
    pub(super) fn spawn_route_warm_up(&self) {
        let backend = self.clone();
        tokio::spawn(async move {
            if backend.with_engine(|navigator| navigator.warm_up_routes()).await.is_some() {
                backend.report_failure(Category::Route).await;
            }
        });
    }

    /// Forward source changes under `root` to the engine
    pub(super) fn start_file_watcher(&self, root: &Path) {
        let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )
        .and_then(|mut watcher| watcher.watch(root, RecursiveMode::Recursive).map(|_| watcher));

        let watcher = match watcher {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!("File watching disabled for {:?}: {}", root, e);
                return;
            }
        };
        *self.file_watcher.lock() = Some(watcher);
        info!("Watching {:?} for source changes", root);

        let navigator = Arc::clone(&self.navigator);
        // Ends when the watcher (and with it the sender) is dropped
        task::spawn_blocking(move || {
            while let Ok(event) = rx.recv() {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("File watcher error: {}", e);
                        continue;
                    }
                };
                let Some(navigator) = navigator.blocking_read().clone() else {
                    continue;
                };
                for path in &event.paths {
                    navigator.file_changed(path);
                }
            }
            debug!("File watcher task terminated");
        });
    }

    pub(super) fn stop_file_watcher(&self) {
        self.file_watcher.lock().take();
    }
}
