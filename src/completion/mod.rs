//! Completion: cursor context detection, ranking and the facade catalog

pub mod context;
pub mod facades;
pub mod ranking;

use serde::Serialize;

pub use context::{CompletionContext, ContextType, HELPERS, HelperSpelling, detect};
pub use facades::FacadeCatalog;
pub use ranking::{RankingMode, rank};

/// Completion items for a detected context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completions {
    pub context: CompletionContext,
    pub items: Vec<String>,
}
