//! The engine façade used by the LSP backend and the CLI
//!
//! A [`Navigator`] owns one [`Project`], its [`SymbolCache`] and the
//! [`FacadeCatalog`], and implements the two request flows:
//!
//! ```text
//! completion:  (line, cursor) ─► detect ─► category + partial ─► cache ─► rank
//! goto:        (line, cursor) ─► detect ─► category + name ─► resolver ─► target
//! ```
//!
//! Every call is synchronous; cold categories are extracted on the calling
//! thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::SymbolCache;
use crate::completion::{CompletionContext, Completions, ContextType, FacadeCatalog, RankingMode, detect, rank};
use crate::config::Project;
use crate::error::{NavigatorError, Result};
use crate::extractors::{Extractor, RelationshipGraph};
use crate::resolver;
use crate::symbols::{Category, SymbolIndex, Target};

#[derive(Debug)]
pub struct Navigator {
    project: Arc<Project>,
    cache: SymbolCache,
    facades: FacadeCatalog,
}

impl Navigator {
    pub fn new(project: Project) -> Self {
        let project = Arc::new(project);
        Self {
            cache: SymbolCache::new(Arc::clone(&project)),
            facades: FacadeCatalog::new(Arc::clone(&project)),
            project,
        }
    }

    /// Discover the project containing `start` and build a navigator for it
    pub fn open(start: &Path) -> Result<Self> {
        Ok(Self::new(Project::open(start)?))
    }

    /// Replace the extractor of one category
    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.cache.set_extractor(extractor);
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn cache(&self) -> &SymbolCache {
        &self.cache
    }

    pub fn symbols(&self, category: Category) -> Arc<SymbolIndex> {
        self.cache.get_or_extract(category)
    }

    pub fn relationships(&self) -> RelationshipGraph {
        RelationshipGraph::from_index(&self.symbols(Category::Relationship))
    }

    /// Completions for the cursor at byte offset `cursor` in `line`
    pub fn complete(&self, line: &str, cursor: usize, mode: RankingMode) -> Option<Completions> {
        let context = detect(line, cursor)?;
        let items = self.complete_context(&context, mode);
        debug!("{} completions for {:?}", items.len(), context.context_type);
        Some(Completions { context, items })
    }

    fn complete_context(&self, context: &CompletionContext, mode: RankingMode) -> Vec<String> {
        match &context.context_type {
            ContextType::Helper { category } => {
                let index = self.symbols(*category);
                rank(index.names(), &context.partial_text, mode)
            }
            // Already filtered by the catalog
            ContextType::StaticMethod { class } => self.facades.complete(class, &context.partial_text),
            ContextType::FluentChain { variable } => {
                let graph = self.relationships();
                let methods: Vec<String> = match graph.model_for_variable(variable) {
                    Some(model) => graph.relationships(model).iter().map(|r| r.method.clone()).collect(),
                    None => graph.all_methods(),
                };
                rank(methods, &context.partial_text, mode)
            }
        }
    }

    /// Resolve the symbol under the cursor
    pub fn goto(&self, line: &str, cursor: usize) -> Option<Target> {
        let context = detect(line, cursor)?;
        match &context.context_type {
            ContextType::Helper { category } => self.resolve(*category, &context.partial_text),
            ContextType::FluentChain { variable } => {
                let method = identifier_at(line, context.match_start);
                let graph = self.relationships();
                let model = graph.model_for_variable(variable)?;
                self.resolve(Category::Relationship, &format!("{}.{}", model, method))
            }
            ContextType::StaticMethod { .. } => None,
        }
    }

    pub fn resolve(&self, category: Category, name: &str) -> Option<Target> {
        let target = resolver::resolve(&self.cache, category, name);
        debug!("Resolved {} '{}' to {:?}", category, name, target.as_ref().map(Target::path));
        target
    }

    pub fn view_candidates(&self, name: &str) -> Vec<PathBuf> {
        resolver::view_candidates(&self.project, name)
    }

    /// Create the file for an unresolved view and refresh the view index
    pub fn create_view_file(&self, name: &str, path: &Path) -> Result<PathBuf> {
        let created = resolver::create_view_file(&self.project, name, path)?;
        self.cache.invalidate(Category::View);
        Ok(created)
    }

    pub fn invalidate(&self, category: Category) {
        self.cache.invalidate(category);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.facades.invalidate();
    }

    /// React to a change of the file at `path`, returning the invalidated
    /// categories
    pub fn file_changed(&self, path: &Path) -> Vec<Category> {
        let path = if path.is_relative() { self.project.path(path) } else { path.to_path_buf() };
        if self.facades.is_project_class_file(&path) {
            self.facades.invalidate();
        }
        let categories = self.cache.invalidate_for_path(&path);
        if !categories.is_empty() {
            debug!("{:?} changed, invalidated {:?}", path, categories);
        }
        categories
    }

    /// Extract the route index ahead of the first request
    pub fn warm_up_routes(&self) -> usize {
        let count = self.symbols(Category::Route).len();
        info!("Route index warmed up with {} routes", count);
        count
    }

    pub fn take_failure(&self, category: Category) -> Option<NavigatorError> {
        self.cache.take_failure(category)
    }
}

/// The identifier starting at byte offset `start`
fn identifier_at(line: &str, start: usize) -> &str {
    let rest = line.get(start..).unwrap_or_default();
    let end = rest
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(rest.len(), |(i, _)| i);
    &rest[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_at() {
        assert_eq!(identifier_at("$user->posts()->latest()", 7), "posts");
        assert_eq!(identifier_at("$user->", 7), "");
    }
}
