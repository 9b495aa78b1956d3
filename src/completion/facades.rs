//! Static-method completions for `Class::partial`
//!
//! Built-in tables cover the framework facades; project classes under the
//! classes root contribute their `public static function` methods. The
//! project scan is memoised with the long TTL.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::cache::TtlSlot;
use crate::config::Project;
use crate::extractors::{read_source, walk_files};

const FACADES: &[(&str, &[&str])] = &[
    ("Arr", &["add", "except", "first", "flatten", "forget", "get", "has", "last", "only", "pluck", "set", "sort", "where", "wrap"]),
    ("Auth", &["attempt", "check", "guard", "guest", "id", "login", "loginUsingId", "logout", "once", "user", "viaRemember"]),
    ("Cache", &["add", "decrement", "flush", "forever", "forget", "get", "has", "increment", "lock", "many", "pull", "put", "remember", "rememberForever", "store", "tags"]),
    ("Config", &["get", "has", "set", "all", "prepend", "push"]),
    ("DB", &["beginTransaction", "commit", "connection", "delete", "insert", "listen", "raw", "rollBack", "select", "statement", "table", "transaction", "update"]),
    ("Event", &["dispatch", "fake", "listen", "subscribe", "until"]),
    ("Gate", &["allows", "authorize", "before", "after", "check", "define", "denies", "forUser", "inspect", "policy"]),
    ("Hash", &["check", "make", "needsRehash", "info"]),
    ("Http", &["acceptJson", "asForm", "baseUrl", "delete", "fake", "get", "head", "patch", "pool", "post", "put", "retry", "timeout", "withHeaders", "withToken"]),
    ("Inertia", &["location", "render", "share", "lazy", "always", "defer", "version"]),
    ("Lang", &["choice", "get", "has", "locale", "setLocale"]),
    ("Log", &["alert", "channel", "critical", "debug", "emergency", "error", "info", "notice", "stack", "warning"]),
    ("Mail", &["bcc", "cc", "fake", "queue", "raw", "send", "to"]),
    ("Queue", &["bulk", "connection", "fake", "later", "push", "pushOn", "size"]),
    ("Route", &["any", "apiResource", "controller", "delete", "fallback", "get", "group", "has", "match", "middleware", "name", "patch", "post", "prefix", "put", "redirect", "resource", "view"]),
    ("Schema", &["create", "drop", "dropIfExists", "hasColumn", "hasTable", "rename", "table"]),
    ("Session", &["all", "flash", "flush", "forget", "get", "has", "put", "pull", "regenerate", "reflash"]),
    ("Storage", &["allFiles", "delete", "disk", "download", "exists", "files", "get", "makeDirectory", "missing", "put", "size", "url"]),
    ("Str", &["after", "before", "camel", "contains", "endsWith", "kebab", "length", "limit", "lower", "plural", "random", "replace", "singular", "slug", "snake", "startsWith", "studly", "title", "upper", "uuid"]),
    ("URL", &["action", "asset", "current", "full", "previous", "route", "signedRoute", "to"]),
    ("Validator", &["extend", "make", "replacer", "validate"]),
    ("View", &["composer", "exists", "first", "make", "share"]),
];

static PUBLIC_STATIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bpublic\s+static\s+function\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*\(")
        .expect("valid static function pattern")
});

/// Class short name → sorted static method names
type MethodTable = BTreeMap<String, Vec<String>>;

/// Public static methods of every class file under `root`
fn scan_static_methods(root: &Path, max_depth: usize) -> MethodTable {
    let is_php = |path: &Path| path.extension().map_or(false, |ext| ext == "php");
    let mut table = MethodTable::new();

    for file in walk_files(root, max_depth, is_php) {
        let (Some(class), Some(text)) = (file.file_stem().and_then(|s| s.to_str()), read_source(&file)) else {
            continue;
        };
        let mut methods: Vec<String> = PUBLIC_STATIC
            .captures_iter(&text)
            .filter_map(|caps| caps.name("name").map(|m| m.as_str().to_string()))
            .collect();
        if methods.is_empty() {
            continue;
        }
        let entry = table.entry(class.to_string()).or_default();
        entry.append(&mut methods);
        entry.sort();
        entry.dedup();
    }

    debug!("Found static methods on {} project classes under {:?}", table.len(), root);
    table
}

/// Producer of pre-filtered static-method completions
#[derive(Debug)]
pub struct FacadeCatalog {
    project: Arc<Project>,
    project_methods: TtlSlot<MethodTable>,
}

impl FacadeCatalog {
    pub fn new(project: Arc<Project>) -> Self {
        let ttl = project.config().cache.long_ttl();
        Self { project, project_methods: TtlSlot::new(ttl) }
    }

    /// Built-in methods for `class`, if it is a known facade
    pub fn builtin(class: &str) -> Option<&'static [&'static str]> {
        FACADES.iter().find(|(name, _)| *name == class).map(|(_, methods)| *methods)
    }

    /// Methods of `class` starting with `partial` (case-insensitive), sorted
    /// and unique
    pub fn complete(&self, class: &str, partial: &str) -> Vec<String> {
        let config = self.project.config();
        let table = self
            .project_methods
            .get_or_refresh(|| scan_static_methods(&self.project.path(&config.classes_root), config.max_walk_depth));

        let needle = partial.to_lowercase();
        let mut methods: Vec<String> = Self::builtin(class)
            .unwrap_or_default()
            .iter()
            .map(|m| m.to_string())
            .chain(table.get(class).into_iter().flatten().cloned())
            .filter(|m| m.to_lowercase().starts_with(&needle))
            .collect();
        methods.sort();
        methods.dedup();
        methods
    }

    /// Forget the project method scan
    pub fn invalidate(&self) {
        self.project_methods.clear();
    }

    pub fn is_project_class_file(&self, path: &Path) -> bool {
        path.starts_with(self.project.path(&self.project.config().classes_root))
            && path.extension().map_or(false, |ext| ext == "php")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use indoc::indoc;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_prefix_is_case_insensitive() {
        let catalog = FacadeCatalog::new(Arc::new(Project::new("/nonexistent", ProjectConfig::default())));
        assert_eq!(catalog.complete("Cache", "REM"), vec!["remember", "rememberForever"]);
        assert!(catalog.complete("Unknown", "").is_empty());
    }

    #[test]
    fn test_project_static_methods_merge_with_builtins() {
        let dir = TempDir::new().unwrap();
        let services = dir.path().join("app/Support");
        fs::create_dir_all(&services).unwrap();
        fs::write(
            services.join("Str.php"),
            indoc! {r#"
                <?php
                class Str {
                    public static function headline($value) {}
                    protected static function hidden() {}
                }
            "#},
        )
        .unwrap();

        let catalog = FacadeCatalog::new(Arc::new(Project::new(dir.path(), ProjectConfig::default())));
        assert_eq!(catalog.complete("Str", "h"), vec!["headline"]);
        assert!(catalog.complete("Str", "").contains(&"slug".to_string()));
    }
}
