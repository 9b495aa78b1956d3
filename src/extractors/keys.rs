//! Config and translation key extraction
//!
//! Both categories are PHP files returning (nested) arrays. Each file
//! contributes its bare stem (`app`, `auth`) and then one symbol per
//! `'key' =>` assignment.
//!
//! Nesting is tracked with a bracket-depth stack rather than parsed, so
//! `'connections' => [ 'mysql' => [ 'host' => ... ] ]` in `database.php`
//! yields `database.connections`, `database.connections.mysql` and
//! `database.connections.mysql.host`. Every key on a line is seen, including
//! keys of one-line arrays. Only `[ ]` arrays are tracked (`array( )` bodies
//! flatten into their parent).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Extractor, files_in_dir, mask_literals, read_source};
use crate::config::Project;
use crate::error::Result;
use crate::symbols::{Category, SymbolEntry};

static KEY_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:'(?P<sq>[^']+)'|"(?P<dq>[^"]+)")\s*=>"#).expect("valid key pattern")
});

/// A key definition found in an array file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    /// Dotted path relative to the file (`connections.mysql.host`)
    pub path: String,
    pub line: usize,
    pub column: usize,
}

enum Token {
    Key(String),
    Open,
    Close,
}

/// Keys and brackets of one line, in column order
///
/// A key must be a real literal: its quotes survive `mask_literals`, so
/// `'a' => 1` written inside a string value or a trailing comment is skipped.
fn line_tokens(line: &str) -> Vec<(usize, Token)> {
    let masked = mask_literals(line);
    let bytes = masked.as_bytes();
    let is_quote_at = |offset: usize| bytes.get(offset).map_or(false, |b| *b == b'\'' || *b == b'"');

    let mut tokens: Vec<(usize, Token)> = KEY_ASSIGNMENT
        .captures_iter(line)
        .filter_map(|caps| caps.name("sq").or_else(|| caps.name("dq")))
        .filter(|m| m.start() > 0 && is_quote_at(m.start() - 1) && is_quote_at(m.end()))
        .map(|m| (m.start(), Token::Key(m.as_str().to_string())))
        .collect();

    tokens.extend(masked.char_indices().filter_map(|(offset, c)| match c {
        '[' => Some((offset, Token::Open)),
        ']' => Some((offset, Token::Close)),
        _ => None,
    }));
    tokens.sort_by_key(|(offset, _)| *offset);
    tokens
}

/// Scan the text of a PHP array file for key assignments
pub fn scan_array_keys(text: &str) -> Vec<KeyDefinition> {
    let mut definitions = Vec::new();
    // (key, depth at which the key's children live)
    let mut stack: Vec<(String, usize)> = Vec::new();
    let mut depth = 0usize;

    for (line_idx, line) in text.lines().enumerate() {
        // The latest key on this line not yet followed by a bracket
        let mut pending: Option<String> = None;

        for (column, token) in line_tokens(line) {
            match token {
                Token::Key(key) => {
                    let mut path = stack.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(".");
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(&key);
                    definitions.push(KeyDefinition { path, line: line_idx, column });
                    pending = Some(key);
                }
                Token::Open => {
                    depth += 1;
                    if let Some(key) = pending.take() {
                        stack.push((key, depth));
                    }
                }
                Token::Close => {
                    depth = depth.saturating_sub(1);
                    pending = None;
                    while stack.last().map_or(false, |(_, d)| *d > depth) {
                        stack.pop();
                    }
                }
            }
        }
    }

    definitions
}

/// Find where `path` is defined in an array file
///
/// Prefers the fully qualified definition, then the first definition of the
/// last segment.
pub fn locate_key(text: &str, path: &str) -> Option<KeyDefinition> {
    let definitions = scan_array_keys(text);
    let last = path.rsplit('.').next().unwrap_or(path);

    definitions
        .iter()
        .find(|d| d.path == path)
        .or_else(|| definitions.iter().find(|d| d.path.rsplit('.').next() == Some(last)))
        .cloned()
}

/// Entries for one array file: the stem, then every key under it
fn entries_for_file(path: &Path, category: Category, extra: &[(&str, &str)]) -> Vec<SymbolEntry> {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let Some(text) = read_source(path) else {
        return Vec::new();
    };

    let with_extra = |mut entry: SymbolEntry| {
        for (key, value) in extra {
            entry = entry.with_extra(key, *value);
        }
        entry
    };

    let mut entries = vec![with_extra(SymbolEntry::new(stem, category, path).with_extra("kind", "file"))];
    for definition in scan_array_keys(&text) {
        entries.push(with_extra(
            SymbolEntry::new(format!("{}.{}", stem, definition.path), category, path)
                .with_extra("line", definition.line.to_string()),
        ));
    }
    entries
}

/// Extracts `config/*.php` keys
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigExtractor;

impl Extractor for ConfigExtractor {
    fn category(&self) -> Category {
        Category::Config
    }

    fn extract(&self, project: &Project) -> Result<Vec<SymbolEntry>> {
        let dir = project.path(&project.config().config_dir);
        Ok(files_in_dir(&dir, "php")
            .iter()
            .flat_map(|file| entries_for_file(file, Category::Config, &[]))
            .collect())
    }
}

/// Locale subdirectories of a lang dir, preferred locale first
pub(crate) fn locale_dirs(lang_dir: &Path, preferred: &str) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(lang_dir) else {
        return Vec::new();
    };

    let mut locales: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| Some((entry.file_name().to_str()?.to_string(), entry.path())))
        .filter(|(name, _)| name != "vendor")
        .collect();
    locales.sort_by(|a, b| (a.0 != preferred, &a.0).cmp(&(b.0 != preferred, &b.0)));
    locales
}

/// JSON translation files (`<locale>.json`), preferred locale first
pub(crate) fn json_locale_files(lang_dir: &Path, preferred: &str) -> Vec<PathBuf> {
    let mut files = files_in_dir(lang_dir, "json");
    files.sort_by_key(|path| path.file_stem().map_or(true, |stem| stem != preferred));
    files
}

/// Top-level keys of a JSON translation file with their lines
pub(crate) fn json_translation_keys(path: &Path) -> Vec<(String, usize)> {
    let Some(text) = read_source(path) else {
        return Vec::new();
    };
    let map: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&text) {
        Ok(map) => map,
        Err(e) => {
            tracing::debug!("Skipping malformed translation file {:?}: {}", path, e);
            return Vec::new();
        }
    };

    map.into_keys()
        .map(|key| {
            let line = json_key_line(&text, &key).unwrap_or(0);
            (key, line)
        })
        .collect()
}

/// Line on which `"key":` appears in a JSON document
pub(crate) fn json_key_line(text: &str, key: &str) -> Option<usize> {
    let encoded = serde_json::to_string(key).ok()?;
    text.lines().position(|line| {
        line.trim_start()
            .strip_prefix(encoded.as_str())
            .map_or(false, |rest| rest.trim_start().starts_with(':'))
    })
}

/// Extracts translation keys from every lang directory and locale
#[derive(Debug, Default, Clone, Copy)]
pub struct TranslationExtractor;

impl Extractor for TranslationExtractor {
    fn category(&self) -> Category {
        Category::Translation
    }

    fn extract(&self, project: &Project) -> Result<Vec<SymbolEntry>> {
        let config = project.config();
        let mut entries = Vec::new();

        for lang_dir in &config.lang_dirs {
            let lang_dir = project.path(lang_dir);

            for (locale, dir) in locale_dirs(&lang_dir, &config.locale) {
                for file in files_in_dir(&dir, "php") {
                    entries.extend(entries_for_file(&file, Category::Translation, &[("locale", locale.as_str())]));
                }
            }

            for file in json_locale_files(&lang_dir, &config.locale) {
                let locale = file.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
                for (key, line) in json_translation_keys(&file) {
                    entries.push(
                        SymbolEntry::new(key, Category::Translation, &file)
                            .with_extra("line", line.to_string())
                            .with_extra("locale", locale.clone())
                            .with_extra("kind", "json"),
                    );
                }
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const DATABASE: &str = indoc! {r#"
        <?php

        return [
            'default' => env('DB_CONNECTION', 'mysql'),

            'connections' => [
                'mysql' => [
                    'host' => env('DB_HOST', '127.0.0.1'),
                    'options' => extension_loaded('pdo_mysql') ? array_filter([
                        PDO::MYSQL_ATTR_SSL_CA => env('MYSQL_ATTR_SSL_CA'),
                    ]) : [],
                ],
            ],

            "migrations" => 'migrations',
        ];
    "#};

    fn paths(text: &str) -> Vec<String> {
        scan_array_keys(text).into_iter().map(|d| d.path).collect()
    }

    #[test]
    fn test_nested_keys_are_fully_qualified() {
        assert_eq!(
            paths(DATABASE),
            vec![
                "default",
                "connections",
                "connections.mysql",
                "connections.mysql.host",
                "connections.mysql.options",
                "migrations",
            ]
        );
    }

    #[test]
    fn test_key_lines_are_recorded() {
        let host = scan_array_keys(DATABASE).into_iter().find(|d| d.path == "connections.mysql.host").unwrap();
        assert_eq!(host.line, 7);
        assert_eq!(host.column, 13);
    }

    #[test]
    fn test_brackets_inside_strings_do_not_nest() {
        let text = indoc! {r#"
            return [
                'pattern' => '[a-z]+[',
                'next' => 1,
            ];
        "#};
        assert_eq!(paths(text), vec!["pattern", "next"]);
    }

    #[test]
    fn test_one_line_arrays() {
        assert_eq!(paths("return ['failed' => 'msg', 'throttle' => 'x'];"), vec!["failed", "throttle"]);

        let text = indoc! {r#"
            return [
                'mail' => ['from' => 'a', 'to' => "b"],
                'name' => 'app',
            ];
        "#};
        assert_eq!(paths(text), vec!["mail", "mail.from", "mail.to", "name"]);

        let to = scan_array_keys(text).into_iter().find(|d| d.path == "mail.to").unwrap();
        assert_eq!((to.line, to.column), (1, 31));
    }

    #[test]
    fn test_later_key_on_line_owns_the_opened_array() {
        let text = indoc! {r#"
            'a' => 1, 'b' => [
                'c' => 2,
            ],
            'd' => 3,
        "#};
        assert_eq!(paths(text), vec!["a", "b", "b.c", "d"]);
    }

    #[test]
    fn test_keys_inside_strings_and_comments_are_ignored() {
        let text = indoc! {r#"
            return [
                'hint' => "use 'x' => 1 here", // 'y' => 2
                'next' => 1,
            ];
        "#};
        assert_eq!(paths(text), vec!["hint", "next"]);
    }

    #[test]
    fn test_locate_key_falls_back_to_last_segment() {
        assert_eq!(locate_key(DATABASE, "connections.mysql.host").unwrap().line, 7);
        assert_eq!(locate_key(DATABASE, "something.host").unwrap().line, 7);
        assert!(locate_key(DATABASE, "missing").is_none());
    }

    #[test]
    fn test_json_key_line() {
        let text = "{\n    \"Welcome\": \"Bienvenue\",\n    \"Log in\": \"Connexion\"\n}\n";
        assert_eq!(json_key_line(text, "Log in"), Some(2));
        assert_eq!(json_key_line(text, "Missing"), None);
    }
}
