//! Route names
//!
//! The static scan reads the route files line by line and records every
//! name binding (`->name('x')`, `'as' => 'x'`) plus the conventional names
//! generated by `Route::resource` / `Route::apiResource`. Group name
//! prefixes (`->name('admin.')->group(...)`) are not applied; a name ending
//! in `.` is treated as a prefix and skipped.
//!
//! Which source is used is decided by [`RouteSource`]:
//! - `static`: only the file scan
//! - `artisan`: only `route:list`; failures produce no routes
//! - `auto`: `route:list` when the project has an `artisan` script, the file
//!   scan otherwise or when the query fails

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::artisan::{ArtisanRouteQuery, CommandRunner, ProcessRunner};
use super::{Extractor, read_source};
use crate::config::{Project, RouteSource};
use crate::error::Result;
use crate::symbols::{Category, SymbolEntry};

static NAME_BINDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:->name\(\s*|['"]as['"]\s*=>\s*)(?:'(?P<sq>[^']+)'|"(?P<dq>[^"]+)")"#)
        .expect("valid route name pattern")
});

static RESOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"Route::(?P<kind>resource|apiResource)\(\s*['"](?P<name>[^'"]+)['"]"#)
        .expect("valid resource pattern")
});

const RESOURCE_ACTIONS: &[&str] = &["index", "create", "store", "show", "edit", "update", "destroy"];
const API_RESOURCE_ACTIONS: &[&str] = &["index", "store", "show", "update", "destroy"];

/// A route name found in a route file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    pub name: String,
    pub line: usize,
    pub column: usize,
    /// Whether the name was generated from a resource declaration
    pub generated: bool,
}

/// Scan one route file's text for route names
pub fn scan_route_names(text: &str) -> Vec<RouteBinding> {
    let mut bindings = Vec::new();

    for (line_idx, line) in text.lines().enumerate() {
        for caps in NAME_BINDING.captures_iter(line) {
            let Some(m) = caps.name("sq").or_else(|| caps.name("dq")) else {
                continue;
            };
            if m.as_str().ends_with('.') {
                continue;
            }
            bindings.push(RouteBinding {
                name: m.as_str().to_string(),
                line: line_idx,
                column: m.start(),
                generated: false,
            });
        }

        for caps in RESOURCE.captures_iter(line) {
            let (Some(kind), Some(name)) = (caps.name("kind"), caps.name("name")) else {
                continue;
            };
            let actions = if kind.as_str() == "apiResource" { API_RESOURCE_ACTIONS } else { RESOURCE_ACTIONS };
            // Nested resources (`photos.comments`) keep their dotted prefix
            for action in actions {
                bindings.push(RouteBinding {
                    name: format!("{}.{}", name.as_str(), action),
                    line: line_idx,
                    column: name.start(),
                    generated: true,
                });
            }
        }
    }

    bindings
}

/// Extracts route names from the configured route source
#[derive(Clone)]
pub struct RouteExtractor {
    query: ArtisanRouteQuery,
}

impl std::fmt::Debug for RouteExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteExtractor").field("query", &self.query).finish()
    }
}

impl RouteExtractor {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(ProcessRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { query: ArtisanRouteQuery::new(runner) }
    }

    /// Route names found by scanning the route files in precedence order
    pub fn scan_files(project: &Project) -> Vec<SymbolEntry> {
        let mut entries = Vec::new();
        for file in &project.config().route_files {
            let path = project.path(file);
            let Some(text) = read_source(&path) else {
                continue;
            };
            for binding in scan_route_names(&text) {
                let mut entry = SymbolEntry::new(binding.name, Category::Route, &path)
                    .with_extra("line", binding.line.to_string())
                    .with_extra("source", "file");
                if binding.generated {
                    entry = entry.with_extra("kind", "resource");
                }
                entries.push(entry);
            }
        }
        entries
    }
}

impl Default for RouteExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for RouteExtractor {
    fn category(&self) -> Category {
        Category::Route
    }

    fn extract(&self, project: &Project) -> Result<Vec<SymbolEntry>> {
        match project.config().route_source {
            RouteSource::Static => Ok(Self::scan_files(project)),
            RouteSource::Artisan => self.query.entries(project),
            RouteSource::Auto if project.path("artisan").is_file() => match self.query.entries(project) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    warn!("route:list unavailable ({}), scanning route files instead", e);
                    Ok(Self::scan_files(project))
                }
            },
            RouteSource::Auto => Ok(Self::scan_files(project)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_scan_name_bindings() {
        let text = indoc! {r#"
            <?php
            Route::get('/', [HomeController::class, 'index'])->name('home');
            Route::get('/about', fn () => view('about'))->name( "about" );
            Route::get('/legacy', ['as' => 'legacy.index', 'uses' => 'LegacyController@index']);
            Route::name('admin.')->group(function () {
                Route::get('/users', UserController::class)->name('users');
            });
        "#};

        let names: Vec<(String, usize)> = scan_route_names(text).into_iter().map(|b| (b.name, b.line)).collect();
        assert_eq!(
            names,
            vec![
                ("home".to_string(), 1),
                ("about".to_string(), 2),
                ("legacy.index".to_string(), 3),
                ("users".to_string(), 5),
            ]
        );
    }

    #[test]
    fn test_scan_resource_routes() {
        let bindings = scan_route_names("Route::apiResource('photos', PhotoController::class);");
        let names: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["photos.index", "photos.store", "photos.show", "photos.update", "photos.destroy"]);
        assert!(bindings.iter().all(|b| b.generated));
    }
}
