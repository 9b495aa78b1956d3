//! Core data model: symbol categories, entries, indexes and resolution targets

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of a project symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Route,
    View,
    Config,
    Translation,
    Env,
    Relationship,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Route,
        Category::View,
        Category::Config,
        Category::Translation,
        Category::Env,
        Category::Relationship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Route => "route",
            Category::View => "view",
            Category::Config => "config",
            Category::Translation => "translation",
            Category::Env => "env",
            Category::Relationship => "relationship",
        }
    }

    /// Whether symbols of this category live inside a file (and therefore
    /// resolve to a line) rather than being a file of their own.
    pub fn resolves_to_location(&self) -> bool {
        !matches!(self, Category::View)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "route" | "routes" => Ok(Category::Route),
            "view" | "views" | "component" | "components" => Ok(Category::View),
            "config" => Ok(Category::Config),
            "translation" | "translations" | "trans" | "lang" => Ok(Category::Translation),
            "env" | "environment" => Ok(Category::Env),
            "relationship" | "relationships" | "model" | "models" => Ok(Category::Relationship),
            other => Err(format!("unknown symbol category '{}'", other)),
        }
    }
}

/// A named symbol produced by an extractor
///
/// Entries are never mutated after extraction; a category's whole index is
/// replaced on the next extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolEntry {
    pub name: String,
    pub category: Category,
    pub source_file: PathBuf,
    /// Category-specific metadata (`line`, `kind`, `action`, `model`, ...)
    pub extra: BTreeMap<String, String>,
}

impl SymbolEntry {
    pub fn new(name: impl Into<String>, category: Category, source_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            category,
            source_file: source_file.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Definition line recorded by the extractor, if any (0-based)
    pub fn line(&self) -> Option<usize> {
        self.extra.get("line").and_then(|l| l.parse().ok())
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// Sorted, de-duplicated list of entries for one category
///
/// Construction sorts by name with a stable sort and keeps the first entry
/// for each name, so the extractor's file-precedence order decides which
/// duplicate survives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolIndex {
    entries: Vec<SymbolEntry>,
}

impl SymbolIndex {
    pub fn from_entries(mut entries: Vec<SymbolEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.dedup_by(|later, earlier| later.name == earlier.name);
        Self { entries }
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a location was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// The line where the symbol is defined
    Definition,
    /// A route's handler, used when the route's name binding was not found
    Handler,
    /// The file exists but the defining line was not found
    File,
}

/// A position inside a file; `line` is 0-based, `column` a 0-based byte offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub kind: LocationKind,
}

impl Location {
    pub fn definition(path: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self { path: path.into(), line, column, kind: LocationKind::Definition }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), line: 0, column: 0, kind: LocationKind::File }
    }
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    File { path: PathBuf },
    Location(Location),
}

impl Target {
    pub fn path(&self) -> &Path {
        match self {
            Target::File { path } => path,
            Target::Location(location) => &location.path,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Target::File { .. } => 0,
            Target::Location(location) => location.line,
        }
    }
}
