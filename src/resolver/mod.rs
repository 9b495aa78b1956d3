//! Symbol resolution
//!
//! Maps `(category, name)` to the artifact the name refers to: a file for
//! views, a line inside a file for everything else. "Not found" is `None`.
//!
//! Each category has its own fallback chain:
//!
//! | category     | tried in order                                              |
//! |--------------|-------------------------------------------------------------|
//! | view         | templates, verbatim components, capitalised components      |
//! | route        | name binding in route files, then the handler method        |
//! | config       | fully qualified key, last segment, the file                 |
//! | translation  | JSON files for sentence keys, PHP group files by locale     |
//! | env          | first dotenv file assigning the key                         |
//! | relationship | relationship method on the model                            |

pub mod locations;
pub mod views;

use crate::cache::SymbolCache;
use crate::symbols::{Category, Target};

pub use locations::{
    find_function, resolve_config, resolve_env, resolve_relationship, resolve_route, resolve_translation,
};
pub use views::{create_view_file, resolve_view, view_candidates};

/// Resolve `name` in `category` against the cache's project
pub fn resolve(cache: &SymbolCache, category: Category, name: &str) -> Option<Target> {
    let project = cache.project();
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let location = match category {
        Category::View => return resolve_view(project, name).map(|path| Target::File { path }),
        Category::Route => resolve_route(project, cache, name),
        Category::Config => resolve_config(project, name),
        Category::Translation => resolve_translation(project, name),
        Category::Env => resolve_env(project, name),
        Category::Relationship => resolve_relationship(project, cache, name),
    };
    location.map(Target::Location)
}
