//! Environment keys from dotenv files

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Extractor, read_source};
use crate::config::Project;
use crate::error::Result;
use crate::symbols::{Category, SymbolEntry};

static ENV_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?P<key>[A-Z][A-Z0-9_]*)\s*=").expect("valid env pattern")
});

/// `(key, line, column)` for every assignment in a dotenv document
pub fn scan_env_keys(text: &str) -> Vec<(String, usize, usize)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .filter_map(|(idx, line)| {
            let key = ENV_ASSIGNMENT.captures(line)?.name("key")?;
            Some((key.as_str().to_string(), idx, key.start()))
        })
        .collect()
}

/// Extracts keys from the configured dotenv files in precedence order
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvExtractor;

impl EnvExtractor {
    fn entries_for_file(path: &Path) -> Vec<SymbolEntry> {
        let Some(text) = read_source(path) else {
            return Vec::new();
        };
        scan_env_keys(&text)
            .into_iter()
            .map(|(key, line, _)| SymbolEntry::new(key, Category::Env, path).with_extra("line", line.to_string()))
            .collect()
    }
}

impl Extractor for EnvExtractor {
    fn category(&self) -> Category {
        Category::Env
    }

    fn extract(&self, project: &Project) -> Result<Vec<SymbolEntry>> {
        Ok(project
            .config()
            .env_files
            .iter()
            .flat_map(|file| Self::entries_for_file(&project.path(file)))
            .collect())
    }
}
