pub mod cache;
pub mod completion;
pub mod config;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod lsp;
pub mod navigator;
pub mod resolver;
pub mod symbols;

pub use completion::{Completions, RankingMode};
pub use config::{ConfigOverrides, Project, ProjectConfig, RouteSource};
pub use error::{NavigatorError, Result};
pub use navigator::Navigator;
pub use symbols::{Category, Location, LocationKind, SymbolEntry, SymbolIndex, Target};
