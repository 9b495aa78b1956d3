//! Project discovery and configuration
//!
//! Initialization order matters: the project root is discovered first, then
//! `ProjectConfig` is loaded relative to it, and only then is the resulting
//! [`Project`] handed to extractors, the cache and the resolver. Nothing in
//! the crate reads the root or the configuration from global state.
//!
//! Every path in [`ProjectConfig`] is relative to the project root. An
//! optional `.laravel-navigator.json` at the root overrides any field.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{NavigatorError, Result};
use crate::symbols::Category;

/// File name of the optional per-project override file
pub const CONFIG_FILE_NAME: &str = ".laravel-navigator.json";

/// Files whose presence marks a project root, in priority order
const ROOT_MARKERS: &[&str] = &["artisan", "composer.json"];

/// Where route names come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    /// Scan route files for name bindings
    Static,
    /// Ask `artisan route:list --json`; failures yield no routes
    Artisan,
    /// Use artisan when the project has an `artisan` script, falling back to
    /// the static scan when the query fails
    Auto,
}

impl std::str::FromStr for RouteSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "static" => Ok(RouteSource::Static),
            "artisan" => Ok(RouteSource::Artisan),
            "auto" => Ok(RouteSource::Auto),
            other => Err(format!("unknown route source '{}'", other)),
        }
    }
}

/// Settings for the external `artisan` query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtisanConfig {
    /// Interpreter used to run the `artisan` script
    pub php: String,
    /// Command prepended to the invocation, e.g. `["docker", "compose", "exec", "app"]`
    pub command_prefix: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ArtisanConfig {
    fn default() -> Self {
        Self {
            php: "php".to_string(),
            command_prefix: Vec::new(),
            timeout_secs: 15,
        }
    }
}

impl ArtisanConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// TTLs for the two cache classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Categories scanned from local files and used in live completion
    pub short_ttl_secs: u64,
    /// Categories that may be backed by the external query
    pub long_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { short_ttl_secs: 30, long_ttl_secs: 60 }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, category: Category) -> Duration {
        match category {
            Category::Route => Duration::from_secs(self.long_ttl_secs),
            _ => Duration::from_secs(self.short_ttl_secs),
        }
    }

    pub fn long_ttl(&self) -> Duration {
        Duration::from_secs(self.long_ttl_secs)
    }
}

/// Project layout and engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Route definition files, in precedence order
    pub route_files: Vec<PathBuf>,
    pub route_source: RouteSource,
    pub views_root: PathBuf,
    /// Template extensions; longer extensions must come first
    pub view_extensions: Vec<String>,
    /// Front-end component roots, lowercase roots before legacy casing
    pub component_roots: Vec<PathBuf>,
    pub component_extensions: Vec<String>,
    pub config_dir: PathBuf,
    pub lang_dirs: Vec<PathBuf>,
    /// Locale searched first when resolving translations
    pub locale: String,
    /// Dotenv files, in precedence order
    pub env_files: Vec<PathBuf>,
    pub models_root: PathBuf,
    /// Root scanned for classes offering static-method completions
    pub classes_root: PathBuf,
    /// Lines searched after a relationship call for the related class
    pub relationship_lookahead: usize,
    /// Bound on directory recursion while walking view and model trees
    pub max_walk_depth: usize,
    pub artisan: ArtisanConfig,
    pub cache: CacheConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            route_files: vec![
                "routes/web.php".into(),
                "routes/api.php".into(),
                "routes/auth.php".into(),
                "routes/channels.php".into(),
                "routes/console.php".into(),
            ],
            route_source: RouteSource::Auto,
            views_root: "resources/views".into(),
            view_extensions: vec![".blade.php".to_string(), ".php".to_string()],
            component_roots: vec![
                "resources/js/pages".into(),
                "resources/js/Pages".into(),
                "resources/js/components".into(),
                "resources/js/Components".into(),
            ],
            component_extensions: vec![
                ".vue".to_string(),
                ".tsx".to_string(),
                ".jsx".to_string(),
                ".svelte".to_string(),
            ],
            config_dir: "config".into(),
            lang_dirs: vec!["lang".into(), "resources/lang".into()],
            locale: "en".to_string(),
            env_files: vec![".env".into(), ".env.local".into(), ".env.example".into()],
            models_root: "app/Models".into(),
            classes_root: "app".into(),
            relationship_lookahead: 3,
            max_walk_depth: 32,
            artisan: ArtisanConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load `<root>/.laravel-navigator.json`, or defaults when it is absent
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            debug!("No {} in {:?}, using defaults", CONFIG_FILE_NAME, root);
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)
            .map_err(|source| NavigatorError::Io { path: path.clone(), source })?;
        let config = serde_json::from_str(&text)
            .map_err(|source| NavigatorError::Config { path: path.clone(), source })?;
        info!("Loaded project configuration from {:?}", path);
        Ok(config)
    }
}

/// Command-line overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub route_source: Option<RouteSource>,
    pub artisan_timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ProjectConfig) {
        if let Some(source) = self.route_source {
            config.route_source = source;
        }
        if let Some(secs) = self.artisan_timeout_secs {
            config.artisan.timeout_secs = secs;
        }
    }
}

/// The explicit context object passed to every component
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: ProjectConfig,
    /// PSR-4 namespace prefix → directory, longest prefix first
    namespaces: Vec<(String, PathBuf)>,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        let root = root.into();
        let namespaces = read_psr4_namespaces(&root);
        Self { root, config, namespaces }
    }

    /// Discover the root above `start` and load its configuration
    pub fn open(start: &Path) -> Result<Self> {
        Self::open_with(start, &ConfigOverrides::default())
    }

    pub fn open_with(start: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let root = discover_root(start).ok_or_else(|| NavigatorError::ProjectNotFound {
            start: start.to_path_buf(),
        })?;
        let mut config = ProjectConfig::load(&root)?;
        overrides.apply(&mut config);
        info!("Opened project at {:?} (routes from {:?})", root, config.route_source);
        Ok(Self::new(root, config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Absolute path for a root-relative path
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Map a fully qualified class name to its source file via PSR-4
    pub fn class_path(&self, class: &str) -> Option<PathBuf> {
        let class = class.trim_start_matches('\\');
        self.namespaces.iter().find_map(|(prefix, dir)| {
            let rest = class.strip_prefix(prefix.as_str())?;
            let relative = rest.replace('\\', "/");
            Some(self.root.join(dir).join(format!("{}.php", relative)))
        })
    }
}

/// Walk `start` and its ancestors looking for a project root marker
pub fn discover_root(start: &Path) -> Option<PathBuf> {
    let start = if start.is_file() { start.parent()? } else { start };
    start.ancestors().find_map(|dir| {
        ROOT_MARKERS
            .iter()
            .any(|marker| dir.join(marker).is_file())
            .then(|| dir.to_path_buf())
    })
}

#[derive(Deserialize)]
struct ComposerManifest {
    #[serde(default)]
    autoload: ComposerAutoload,
}

#[derive(Default, Deserialize)]
struct ComposerAutoload {
    #[serde(default, rename = "psr-4")]
    psr4: BTreeMap<String, serde_json::Value>,
}

/// Read `autoload.psr-4` from composer.json; `App\` → `app/` when absent
fn read_psr4_namespaces(root: &Path) -> Vec<(String, PathBuf)> {
    let mut namespaces: Vec<(String, PathBuf)> = fs::read_to_string(root.join("composer.json"))
        .ok()
        .and_then(|text| serde_json::from_str::<ComposerManifest>(&text).ok())
        .map(|manifest| {
            manifest
                .autoload
                .psr4
                .into_iter()
                .filter_map(|(prefix, dirs)| {
                    // A PSR-4 entry is either one directory or a list of them
                    let dir = match dirs {
                        serde_json::Value::String(dir) => dir,
                        serde_json::Value::Array(list) => list.first()?.as_str()?.to_string(),
                        _ => return None,
                    };
                    Some((prefix, PathBuf::from(dir)))
                })
                .collect()
        })
        .unwrap_or_default();

    if namespaces.is_empty() {
        namespaces.push(("App\\".to_string(), PathBuf::from("app")));
    }
    namespaces.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    namespaces
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_root_from_nested_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("artisan"), "#!/usr/bin/env php").unwrap();
        let nested = dir.path().join("app/Http/Controllers");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("HomeController.php");
        fs::write(&file, "<?php").unwrap();

        assert_eq!(discover_root(&file).as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_overrides_and_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "route_source": "static", "artisan": { "command_prefix": ["sail"] } }"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.route_source, RouteSource::Static);
        assert_eq!(config.artisan.command_prefix, vec!["sail".to_string()]);
        assert_eq!(config.artisan.php, "php");
        assert_eq!(config.views_root, PathBuf::from("resources/views"));
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "view_root": "x" }"#).unwrap();
        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(NavigatorError::Config { .. })
        ));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("composer.json"), "{}").unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "route_source": "artisan" }"#).unwrap();

        let overrides = ConfigOverrides { route_source: Some(RouteSource::Static), artisan_timeout_secs: Some(3) };
        let project = Project::open_with(dir.path(), &overrides).unwrap();
        assert_eq!(project.config().route_source, RouteSource::Static);
        assert_eq!(project.config().artisan.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_class_path_uses_composer_psr4() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("composer.json"),
            r#"{ "autoload": { "psr-4": { "App\\": "app/", "Domain\\": ["src/Domain/"] } } }"#,
        )
        .unwrap();
        let project = Project::new(dir.path(), ProjectConfig::default());

        assert_eq!(
            project.class_path("App\\Http\\Controllers\\HomeController"),
            Some(dir.path().join("app/Http/Controllers/HomeController.php"))
        );
        assert_eq!(
            project.class_path("\\Domain\\Billing\\Invoice"),
            Some(dir.path().join("src/Domain/Billing/Invoice.php"))
        );
        assert_eq!(project.class_path("Vendor\\Thing"), None);
    }
}
