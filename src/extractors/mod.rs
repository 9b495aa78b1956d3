//! Symbol extractors
//!
//! Each extractor scans a fixed part of the project tree and produces the
//! full list of symbols for one category. Extractors are read-only and
//! idempotent, and a missing directory or unreadable file simply contributes
//! nothing. They are pattern matchers over lines, not parsers.
//!
//! [`Extractor`] is the strategy boundary: a grammar-based implementation
//! for any category can replace the line-oriented one without touching the
//! cache, resolver or ranker.

pub mod artisan;
pub mod env;
pub mod keys;
pub mod relationships;
pub mod routes;
pub mod views;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::Project;
use crate::error::Result;
use crate::symbols::{Category, SymbolEntry};

pub use artisan::{
    ArtisanRouteQuery, CommandOutput, CommandRequest, CommandRunner, ProcessRunner, RouteRecord, split_action,
};
pub use env::EnvExtractor;
pub use keys::{ConfigExtractor, TranslationExtractor, scan_array_keys};
pub use relationships::{Relationship, RelationshipExtractor, RelationshipGraph};
pub use routes::RouteExtractor;
pub use views::ViewExtractor;

/// Produces every symbol of one category for a project
pub trait Extractor: Send + Sync {
    fn category(&self) -> Category;

    /// Only extractors backed by an external query return `Err`; file
    /// scanners degrade to an empty list instead.
    fn extract(&self, project: &Project) -> Result<Vec<SymbolEntry>>;
}

/// The default extractor for each category
pub fn default_extractors() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(RouteExtractor::new()),
        Box::new(ViewExtractor),
        Box::new(ConfigExtractor),
        Box::new(TranslationExtractor),
        Box::new(EnvExtractor),
        Box::new(RelationshipExtractor),
    ]
}

/// Read a source file, treating any failure as "no content"
pub(crate) fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            debug!("Skipping unreadable source {:?}: {}", path, e);
            None
        }
    }
}

/// Files directly inside `dir` with the given extension, sorted by name
pub(crate) fn files_in_dir(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping missing directory {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == extension))
        .collect();
    files.sort();
    files
}

/// Files below `root` (recursively, following symlinks) for which `keep`
/// returns true, sorted by path
///
/// Symlink loops are reported by walkdir as errors and skipped; `max_depth`
/// bounds the walk regardless.
pub(crate) fn walk_files(root: &Path, max_depth: usize, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    if !root.is_dir() {
        debug!("Skipping missing directory {:?}", root);
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|result| match result {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping entry under {:?}: {}", root, e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && keep(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Replace the contents of string literals and trailing `//` or `#` comments
/// with spaces, keeping byte offsets intact
///
/// Used by the line-oriented scanners to count brackets and braces without
/// being fooled by literals like `'['` or `'{'`.
pub(crate) fn mask_literals(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                    out.push(c);
                    continue;
                }
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                    out.push(c);
                } else if c == '#' || (c == '/' && chars.peek() == Some(&'/')) {
                    break;
                } else {
                    out.push(c);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_literals_hides_brackets_in_strings() {
        let masked = mask_literals("'key' => '[{', // ]");
        assert_eq!(masked.matches('[').count(), 0);
        assert_eq!(masked.matches(']').count(), 0);
        assert!(masked.starts_with("'   ' =>"));
    }

    #[test]
    fn test_walk_files_missing_root_is_empty() {
        let files = walk_files(Path::new("/definitely/not/here"), 8, |_| true);
        assert!(files.is_empty());
    }
}
