//! In-file symbol resolution: routes, config keys, translations, env keys
//! and relationships

use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::cache::SymbolCache;
use crate::config::Project;
use crate::extractors::env::scan_env_keys;
use crate::extractors::keys::{json_key_line, json_locale_files, locale_dirs, locate_key};
use crate::extractors::read_source;
use crate::extractors::routes::scan_route_names;
use crate::extractors::split_action;
use crate::symbols::{Category, Location, LocationKind};

/// Line and column of the `function <name>(` declaration in `text`
pub fn find_function(text: &str, name: &str) -> Option<(usize, usize)> {
    let pattern = Regex::new(&format!(r"\bfunction\s+(?P<name>{})\s*\(", regex::escape(name))).ok()?;
    text.lines().enumerate().find_map(|(idx, line)| {
        let m = pattern.captures(line)?.name("name")?;
        Some((idx, m.start()))
    })
}

/// The line binding route `name` in the route files, or the handler of the
/// route when no binding is found
pub fn resolve_route(project: &Project, cache: &SymbolCache, name: &str) -> Option<Location> {
    for file in &project.config().route_files {
        let path = project.path(file);
        let Some(text) = read_source(&path) else {
            continue;
        };
        if let Some(binding) = scan_route_names(&text).into_iter().find(|b| b.name == name) {
            return Some(Location::definition(path, binding.line, binding.column));
        }
    }

    let index = cache.get_or_extract(Category::Route);
    let action = index.get(name)?.extra("action")?;
    let (class, method) = split_action(action)?;
    let path = project.class_path(class).filter(|p| p.is_file())?;
    debug!("Route '{}' has no binding line, using handler {}@{}", name, class, method);

    let (line, column) = read_source(&path)
        .and_then(|text| find_function(&text, method))
        .unwrap_or((0, 0));
    Some(Location { path, line, column, kind: LocationKind::Handler })
}

/// Look `key_path` up in a PHP array file: the defining line, or the file
fn locate_in_array_file(path: &Path, key_path: &str) -> Option<Location> {
    if !path.is_file() {
        return None;
    }
    if key_path.is_empty() {
        return Some(Location::file(path));
    }
    let text = read_source(path)?;
    Some(match locate_key(&text, key_path) {
        Some(def) => Location::definition(path, def.line, def.column),
        None => Location::file(path),
    })
}

/// `file.key.path` → `config/file.php` at the key's line
pub fn resolve_config(project: &Project, name: &str) -> Option<Location> {
    let (file, key_path) = name.split_once('.').unwrap_or((name, ""));
    let path = project.path(&project.config().config_dir).join(format!("{}.php", file));
    locate_in_array_file(&path, key_path)
}

fn resolve_json_translation(project: &Project, key: &str) -> Option<Location> {
    let config = project.config();
    config.lang_dirs.iter().find_map(|lang_dir| {
        json_locale_files(&project.path(lang_dir), &config.locale)
            .into_iter()
            .find_map(|file| {
                let text = read_source(&file)?;
                let line = json_key_line(&text, key)?;
                // Column of the first character inside the key's quotes
                let column = text.lines().nth(line).and_then(|l| l.find('"')).map_or(0, |c| c + 1);
                Some(Location::definition(file, line, column))
            })
    })
}

fn resolve_php_translation(project: &Project, name: &str) -> Option<Location> {
    let config = project.config();
    let (file, key_path) = name.split_once('.').unwrap_or((name, ""));

    let files: Vec<_> = config
        .lang_dirs
        .iter()
        .flat_map(|lang_dir| locale_dirs(&project.path(lang_dir), &config.locale))
        .map(|(_, dir)| dir.join(format!("{}.php", file)))
        .filter(|path| path.is_file())
        .collect();

    // Prefer a locale that defines the key over one that only has the file
    files
        .iter()
        .filter_map(|path| locate_in_array_file(path, key_path))
        .find(|location| location.kind == LocationKind::Definition)
        .or_else(|| files.first().map(Location::file))
}

/// Translation keys: JSON files for sentence keys, PHP group files otherwise
pub fn resolve_translation(project: &Project, name: &str) -> Option<Location> {
    let sentence = name.contains(' ') || !name.contains('.');
    if sentence {
        if let Some(location) = resolve_json_translation(project, name) {
            return Some(location);
        }
        if name.contains(' ') && !name.contains('.') {
            return None;
        }
    }
    resolve_php_translation(project, name)
}

/// The first dotenv file (in precedence order) assigning `key`
pub fn resolve_env(project: &Project, key: &str) -> Option<Location> {
    project.config().env_files.iter().find_map(|file| {
        let path = project.path(file);
        let text = read_source(&path)?;
        let (_, line, column) = scan_env_keys(&text).into_iter().find(|(k, _, _)| k == key)?;
        Some(Location::definition(path, line, column))
    })
}

/// `Model.method` → the method's declaration in the model file
pub fn resolve_relationship(project: &Project, cache: &SymbolCache, name: &str) -> Option<Location> {
    let (model, method) = name.rsplit_once('.')?;
    let index = cache.get_or_extract(Category::Relationship);
    let path = match index.get(name) {
        Some(entry) => entry.source_file.clone(),
        None => project.path(&project.config().models_root).join(format!("{}.php", model)),
    };

    let text = read_source(&path)?;
    Some(match find_function(&text, method) {
        Some((line, column)) => Location::definition(path, line, column),
        None => Location::file(path),
    })
}
