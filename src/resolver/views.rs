//! View and component resolution
//!
//! A view name may point at a server-side template or at a front-end page
//! component, and component directories come in both `pages` and `Pages`
//! spellings. Candidates are tried in a fixed order:
//!
//! 1. `<views_root>/<name><ext>` for each template extension
//! 2. `<root>/<name><ext>` for each component root and extension, verbatim
//! 3. the same with every path segment capitalised
//!
//! The first candidate that exists on disk wins.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Project;
use crate::error::{NavigatorError, Result};

fn segments(name: &str) -> Vec<&str> {
    name.split(|c| c == '.' || c == '/').filter(|s| !s.is_empty()).collect()
}

fn capitalise(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn candidate(root: &Path, segments: &[String], extension: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    if let Some((last, dirs)) = segments.split_last() {
        for dir in dirs {
            path.push(dir);
        }
        path.push(format!("{}{}", last, extension));
    }
    path
}

/// Every path `name` may resolve to, in resolution order, without duplicates
pub fn view_candidates(project: &Project, name: &str) -> Vec<PathBuf> {
    let verbatim: Vec<String> = segments(name).into_iter().map(str::to_string).collect();
    if verbatim.is_empty() {
        return Vec::new();
    }
    let capitalised: Vec<String> = verbatim.iter().map(|s| capitalise(s)).collect();
    let config = project.config();

    let views_root = project.path(&config.views_root);
    let component_roots: Vec<PathBuf> = config.component_roots.iter().map(|r| project.path(r)).collect();

    let mut candidates: Vec<PathBuf> = config
        .view_extensions
        .iter()
        .map(|ext| candidate(&views_root, &verbatim, ext))
        .collect();
    for segs in [&verbatim, &capitalised] {
        for root in &component_roots {
            for ext in &config.component_extensions {
                candidates.push(candidate(root, segs, ext));
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|path| seen.insert(path.clone()));
    candidates
}

/// The first existing candidate for `name`
pub fn resolve_view(project: &Project, name: &str) -> Option<PathBuf> {
    let found = view_candidates(project, name).into_iter().find(|path| path.is_file());
    debug!("View '{}' resolved to {:?}", name, found);
    found
}

/// Create an empty file at `path` for an unresolved view
///
/// `path` (absolute or root-relative) must be one of the view's candidates and
/// must not exist yet. Missing parent directories are created.
pub fn create_view_file(project: &Project, name: &str, path: &Path) -> Result<PathBuf> {
    let path = if path.is_relative() { project.path(path) } else { path.to_path_buf() };

    if !view_candidates(project, name).contains(&path) {
        return Err(NavigatorError::NotACandidate { path });
    }
    if path.exists() {
        return Err(NavigatorError::AlreadyExists { path });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| NavigatorError::CreateFile { path: path.clone(), source })?;
    }
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => {
            info!("Created view file {:?} for '{}'", path, name);
            Ok(path)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(NavigatorError::AlreadyExists { path }),
        Err(source) => Err(NavigatorError::CreateFile { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use tempfile::TempDir;

    #[test]
    fn test_candidate_order() {
        let project = Project::new("/srv/app", ProjectConfig::default());
        let candidates = view_candidates(&project, "admin.dashboard");
        let relative: Vec<String> = candidates
            .iter()
            .map(|p| p.strip_prefix("/srv/app").unwrap().display().to_string())
            .collect();

        assert_eq!(relative[0], "resources/views/admin/dashboard.blade.php");
        assert_eq!(relative[1], "resources/views/admin/dashboard.php");
        assert_eq!(relative[2], "resources/js/pages/admin/dashboard.vue");
        assert_eq!(relative[6], "resources/js/Pages/admin/dashboard.vue");
        // 2 templates + 4 roots x 4 extensions verbatim + the same capitalised
        assert_eq!(relative.len(), 2 + 16 + 16);
        assert_eq!(relative[18], "resources/js/pages/Admin/Dashboard.vue");
    }

    #[test]
    fn test_capitalised_duplicates_are_dropped() {
        let project = Project::new("/srv/app", ProjectConfig::default());
        let candidates = view_candidates(&project, "Admin/Dashboard");
        assert_eq!(candidates.len(), 2 + 16);
    }

    #[test]
    fn test_empty_name_has_no_candidates() {
        let project = Project::new("/srv/app", ProjectConfig::default());
        assert!(view_candidates(&project, "").is_empty());
        assert!(view_candidates(&project, "..").is_empty());
    }

    #[test]
    fn test_create_view_file() {
        let dir = TempDir::new().unwrap();
        let project = Project::new(dir.path(), ProjectConfig::default());

        let created = create_view_file(&project, "emails.welcome", Path::new("resources/views/emails/welcome.blade.php"))
            .unwrap();
        assert!(created.is_file());
        assert_eq!(resolve_view(&project, "emails.welcome"), Some(created.clone()));

        assert!(matches!(
            create_view_file(&project, "emails.welcome", &created),
            Err(NavigatorError::AlreadyExists { .. })
        ));
        assert!(matches!(
            create_view_file(&project, "emails.welcome", Path::new("resources/views/other.blade.php")),
            Err(NavigatorError::NotACandidate { .. })
        ));
    }
}
