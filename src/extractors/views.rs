//! View templates and front-end components
//!
//! Templates under the views root and components under each component root
//! share one dotted namespace: `resources/views/admin/users/index.blade.php`
//! becomes `admin.users.index`, `resources/js/Pages/Admin/Dashboard.tsx`
//! becomes `Admin.Dashboard`. On-disk case is preserved.

use std::path::Path;

use super::{Extractor, walk_files};
use crate::config::Project;
use crate::error::Result;
use crate::symbols::{Category, SymbolEntry};

/// Strip the first matching extension (callers list longer ones first)
pub(crate) fn strip_extension<'a>(file_name: &'a str, extensions: &[String]) -> Option<&'a str> {
    extensions.iter().find_map(|ext| file_name.strip_suffix(ext.as_str()).filter(|stem| !stem.is_empty()))
}

/// Dotted symbol name for `path` below `root`
pub(crate) fn dotted_name(root: &Path, path: &Path, extensions: &[String]) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments: Vec<&str> = relative.iter().map(|s| s.to_str()).collect::<Option<_>>()?;
    let file_name = segments.pop()?;
    segments.push(strip_extension(file_name, extensions)?);
    Some(segments.join("."))
}

fn entries_under(
    project: &Project,
    root: &Path,
    extensions: &[String],
    kind: &str,
) -> Vec<SymbolEntry> {
    let root = project.path(root);
    let max_depth = project.config().max_walk_depth;
    let has_extension = |path: &Path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |name| strip_extension(name, extensions).is_some())
    };

    walk_files(&root, max_depth, has_extension)
        .into_iter()
        .filter_map(|path| {
            let name = dotted_name(&root, &path, extensions)?;
            let relative_root = root.strip_prefix(project.root()).unwrap_or(&root).display().to_string();
            Some(
                SymbolEntry::new(name, Category::View, path)
                    .with_extra("kind", kind)
                    .with_extra("root", relative_root),
            )
        })
        .collect()
}

/// Extracts templates first, then components root by root
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewExtractor;

impl Extractor for ViewExtractor {
    fn category(&self) -> Category {
        Category::View
    }

    fn extract(&self, project: &Project) -> Result<Vec<SymbolEntry>> {
        let config = project.config();
        let mut entries = entries_under(project, &config.views_root, &config.view_extensions, "template");
        for root in &config.component_roots {
            entries.extend(entries_under(project, root, &config.component_extensions, "component"));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dotted_name_prefers_longest_extension() {
        let root = PathBuf::from("/p/resources/views");
        let path = root.join("admin/users/index.blade.php");
        assert_eq!(
            dotted_name(&root, &path, &exts(&[".blade.php", ".php"])).as_deref(),
            Some("admin.users.index")
        );
    }

    #[test]
    fn test_dotted_name_rejects_other_extensions() {
        let root = PathBuf::from("/p/resources/js/Pages");
        assert_eq!(dotted_name(&root, &root.join("Admin/README.md"), &exts(&[".tsx"])), None);
        assert_eq!(
            dotted_name(&root, &root.join("Admin/Dashboard.tsx"), &exts(&[".tsx"])).as_deref(),
            Some("Admin.Dashboard")
        );
    }
}
