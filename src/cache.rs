//! Per-category TTL memo over the extractors
//!
//! # Architecture
//!
//! - **Slots**: one per [`Category`], each owning its extractor and a
//!   [`TtlSlot`] holding the last `Arc<SymbolIndex>` and when it was produced
//! - **Locking**: a slot's `parking_lot::Mutex` is held across extraction, so
//!   at most one extraction per category runs at a time and concurrent readers
//!   of a cold slot wait for the same scan instead of starting their own
//! - **Copy-on-write**: an index is never modified after construction;
//!   refreshing swaps the whole `Arc`, so a reader never observes a partially
//!   built list
//! - **TTL**: routes use the long TTL (they may come from the external query),
//!   every other category the short one. An empty index is a valid entry.
//!
//! There is no background refresh. A stale slot is re-extracted synchronously
//! by the first reader after expiry.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Project;
use crate::error::NavigatorError;
use crate::extractors::{Extractor, default_extractors};
use crate::symbols::{Category, SymbolIndex};

/// A memoised value with the instant it was produced
#[derive(Debug)]
struct Memo<T> {
    value: Option<(Arc<T>, Instant)>,
    refreshes: usize,
}

/// A single TTL-bounded value, refreshed on demand
///
/// Shared by the symbol cache and the facade catalog.
#[derive(Debug)]
pub struct TtlSlot<T> {
    ttl: Duration,
    memo: Mutex<Memo<T>>,
}

impl<T> TtlSlot<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            memo: Mutex::new(Memo { value: None, refreshes: 0 }),
        }
    }

    /// Return the memoised value while it is younger than the TTL, otherwise
    /// run `refresh` (holding the slot lock) and store its result
    pub fn get_or_refresh(&self, refresh: impl FnOnce() -> T) -> Arc<T> {
        let mut memo = self.memo.lock();
        if let Some((value, produced_at)) = &memo.value {
            if produced_at.elapsed() < self.ttl {
                return Arc::clone(value);
            }
        }

        let value = Arc::new(refresh());
        memo.value = Some((Arc::clone(&value), Instant::now()));
        memo.refreshes += 1;
        value
    }

    /// The memoised value and when it was produced, ignoring the TTL
    pub fn peek(&self) -> Option<(Arc<T>, Instant)> {
        self.memo.lock().value.clone()
    }

    /// Drop the memoised value so the next read refreshes exactly once
    pub fn clear(&self) {
        self.memo.lock().value = None;
    }

    /// Number of refreshes performed so far
    pub fn refreshes(&self) -> usize {
        self.memo.lock().refreshes
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// A snapshot of one category's cached index
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub category: Category,
    pub data: Arc<SymbolIndex>,
    pub produced_at: Instant,
}

struct Slot {
    extractor: Box<dyn Extractor>,
    index: TtlSlot<SymbolIndex>,
    /// Last extraction error not yet reported
    failure: Mutex<Option<NavigatorError>>,
}

impl Slot {
    fn new(extractor: Box<dyn Extractor>, ttl: Duration) -> Self {
        Self {
            extractor,
            index: TtlSlot::new(ttl),
            failure: Mutex::new(None),
        }
    }
}

/// The symbol cache for one project
pub struct SymbolCache {
    project: Arc<Project>,
    slots: BTreeMap<Category, Slot>,
}

impl std::fmt::Debug for SymbolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolCache")
            .field("root", &self.project.root())
            .field("categories", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SymbolCache {
    /// Cache backed by the default extractor of every category
    pub fn new(project: Arc<Project>) -> Self {
        Self::with_extractors(project, default_extractors())
    }

    /// Cache backed by the given extractors; a later extractor for the same
    /// category replaces an earlier one
    pub fn with_extractors(project: Arc<Project>, extractors: Vec<Box<dyn Extractor>>) -> Self {
        let mut cache = Self { project, slots: BTreeMap::new() };
        for extractor in extractors {
            cache.set_extractor(extractor);
        }
        cache
    }

    /// Install `extractor` for its category, discarding any cached index
    pub fn set_extractor(&mut self, extractor: Box<dyn Extractor>) {
        let category = extractor.category();
        let ttl = self.project.config().cache.ttl_for(category);
        debug!("Installing {} extractor (ttl {:?})", category, ttl);
        self.slots.insert(category, Slot::new(extractor, ttl));
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    /// The index for `category`, extracting it when cold or expired
    ///
    /// Extraction errors are logged, recorded for [`take_failure`], and
    /// produce an empty index.
    ///
    /// [`take_failure`]: SymbolCache::take_failure
    pub fn get_or_extract(&self, category: Category) -> Arc<SymbolIndex> {
        let Some(slot) = self.slots.get(&category) else {
            debug!("No extractor registered for {}", category);
            return Arc::new(SymbolIndex::default());
        };

        slot.index.get_or_refresh(|| {
            let started = Instant::now();
            match slot.extractor.extract(&self.project) {
                Ok(entries) => {
                    let index = SymbolIndex::from_entries(entries);
                    info!("Extracted {} {} symbols in {:?}", index.len(), category, started.elapsed());
                    index
                }
                Err(e) => {
                    warn!("Extraction of {} symbols failed: {}", category, e);
                    *slot.failure.lock() = Some(e);
                    SymbolIndex::default()
                }
            }
        })
    }

    /// The cached entry for `category` without extracting, if any
    pub fn entry(&self, category: Category) -> Option<CacheEntry> {
        let (data, produced_at) = self.slots.get(&category)?.index.peek()?;
        Some(CacheEntry { category, data, produced_at })
    }

    pub fn invalidate(&self, category: Category) {
        if let Some(slot) = self.slots.get(&category) {
            debug!("Invalidating {} cache", category);
            slot.index.clear();
        }
    }

    pub fn invalidate_all(&self) {
        for category in self.slots.keys() {
            self.invalidate(*category);
        }
    }

    /// Invalidate every category fed by `path` and return them
    pub fn invalidate_for_path(&self, path: &Path) -> Vec<Category> {
        let categories = categories_for_path(&self.project, path);
        for category in &categories {
            self.invalidate(*category);
        }
        categories
    }

    /// The last unreported extraction error for `category`
    pub fn take_failure(&self, category: Category) -> Option<NavigatorError> {
        self.slots.get(&category)?.failure.lock().take()
    }

    /// How many extractions have run for `category`
    pub fn scan_count(&self, category: Category) -> usize {
        self.slots.get(&category).map_or(0, |slot| slot.index.refreshes())
    }
}

fn has_any_suffix(path: &Path, suffixes: &[String]) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |name| suffixes.iter().any(|s| name.ends_with(s.as_str())))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().map_or(false, |ext| ext == extension)
}

/// Categories whose index depends on the file at `path`
pub fn categories_for_path(project: &Project, path: &Path) -> Vec<Category> {
    let path = if path.is_relative() { project.path(path) } else { path.to_path_buf() };
    let config = project.config();
    let under = |dir: &Path| path.starts_with(project.path(dir));
    let mut categories = Vec::new();

    if config.route_files.iter().any(|file| path == project.path(file)) {
        categories.push(Category::Route);
    }
    if (under(config.views_root.as_path()) && has_any_suffix(&path, &config.view_extensions))
        || (config.component_roots.iter().any(|root| under(root.as_path()))
            && has_any_suffix(&path, &config.component_extensions))
    {
        categories.push(Category::View);
    }
    if under(config.config_dir.as_path()) && has_extension(&path, "php") {
        categories.push(Category::Config);
    }
    if config.lang_dirs.iter().any(|dir| under(dir.as_path()))
        && (has_extension(&path, "php") || has_extension(&path, "json"))
    {
        categories.push(Category::Translation);
    }
    if config.env_files.iter().any(|file| path == project.path(file)) {
        categories.push(Category::Env);
    }
    if under(config.models_root.as_path()) && has_extension(&path, "php") {
        categories.push(Category::Relationship);
    }

    categories
}
