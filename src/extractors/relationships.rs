//! Eloquent relationships declared on model classes
//!
//! Every `*.php` file under the models root is read line by line. A small
//! state machine tracks whether the current line sits inside a method body
//! (by brace depth) and attributes `$this->hasMany(...)`-family calls to the
//! enclosing method:
//!
//! ```text
//!   Outside ──function name(──► Declared ──{──► InBody ──depth back──► Outside
//!                                                  │
//!                                  $this->kind( ───┘ record (method, kind, line)
//! ```
//!
//! The related class (`Post::class`) is taken from the call line, or from
//! the next `relationship_lookahead` lines when the call is split.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{Extractor, mask_literals, read_source, walk_files};
use crate::config::Project;
use crate::error::Result;
use crate::symbols::{Category, SymbolEntry, SymbolIndex};

static METHOD_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bfunction\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("valid method pattern")
});

static RELATION_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\$this\s*->\s*(?P<kind>hasOne|hasMany|belongsTo|belongsToMany|hasOneThrough|hasManyThrough|morphOne|morphMany|morphTo|morphToMany|morphedByMany)\s*\(",
    )
    .expect("valid relation pattern")
});

static CLASS_CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<class>\\?[A-Za-z_][A-Za-z0-9_]*(?:\\[A-Za-z_][A-Za-z0-9_]*)*)::class\b")
        .expect("valid class constant pattern")
});

/// A relationship method on a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub method: String,
    /// Relationship call, e.g. `hasMany`
    pub kind: String,
    /// Short name of the related model; `morphTo` has none
    pub related: Option<String>,
    /// Line of the method declaration (0-based)
    pub line: usize,
}

#[derive(Debug)]
struct OpenMethod {
    name: String,
    line: usize,
    /// Brace depth outside the method
    outer_depth: usize,
    body_opened: bool,
}

fn short_class_name(class: &str) -> &str {
    class.rsplit('\\').next().unwrap_or(class)
}

/// Scan a model source file for relationship methods
pub fn scan_relationships(text: &str, lookahead: usize) -> Vec<Relationship> {
    let lines: Vec<&str> = text.lines().collect();
    let mut relationships = Vec::new();
    let mut depth = 0usize;
    let mut method: Option<OpenMethod> = None;

    for (idx, line) in lines.iter().enumerate() {
        let masked = mask_literals(line);

        if let Some(caps) = METHOD_DECLARATION.captures(&masked) {
            if let Some(name) = caps.name("name") {
                method = Some(OpenMethod {
                    name: name.as_str().to_string(),
                    line: idx,
                    outer_depth: depth,
                    body_opened: false,
                });
            }
        }

        if let (Some(open), Some(caps)) = (&method, RELATION_CALL.captures(&masked)) {
            let kind = caps.name("kind").map(|m| m.as_str()).unwrap_or_default();
            let call_end = caps.get(0).map_or(0, |m| m.end());
            // The related class is normally the call's first argument
            let related = CLASS_CONSTANT
                .captures(&masked[call_end..])
                .and_then(|c| c.name("class"))
                .map(|m| short_class_name(m.as_str()).to_string())
                .or_else(|| {
                    lines.iter().skip(idx + 1).take(lookahead).find_map(|next| {
                        let next = mask_literals(next);
                        let class = CLASS_CONSTANT.captures(&next)?.name("class")?.as_str().to_string();
                        Some(short_class_name(&class).to_string())
                    })
                });

            if !relationships.iter().any(|r: &Relationship| r.method == open.name) {
                relationships.push(Relationship {
                    method: open.name.clone(),
                    kind: kind.to_string(),
                    related,
                    line: open.line,
                });
            }
        }

        let opens = masked.matches('{').count();
        let closes = masked.matches('}').count();
        depth = (depth + opens).saturating_sub(closes);

        if let Some(open) = &mut method {
            if depth > open.outer_depth {
                open.body_opened = true;
            } else if open.body_opened || masked.contains(';') {
                // Body closed, or an abstract/interface declaration
                method = None;
            }
        }
    }

    relationships
}

/// Extracts `Model.method` relationship entries
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationshipExtractor;

impl RelationshipExtractor {
    fn entries_for_file(path: &Path, lookahead: usize) -> Vec<SymbolEntry> {
        let Some(model) = path.file_name().and_then(|n| n.to_str()).and_then(|n| n.strip_suffix(".php")) else {
            return Vec::new();
        };
        let Some(text) = read_source(path) else {
            return Vec::new();
        };

        scan_relationships(&text, lookahead)
            .into_iter()
            .map(|rel| {
                let mut entry = SymbolEntry::new(format!("{}.{}", model, rel.method), Category::Relationship, path)
                    .with_extra("model", model)
                    .with_extra("method", rel.method)
                    .with_extra("kind", rel.kind)
                    .with_extra("line", rel.line.to_string());
                if let Some(related) = rel.related {
                    entry = entry.with_extra("related", related);
                }
                entry
            })
            .collect()
    }
}

impl Extractor for RelationshipExtractor {
    fn category(&self) -> Category {
        Category::Relationship
    }

    fn extract(&self, project: &Project) -> Result<Vec<SymbolEntry>> {
        let config = project.config();
        let root = project.path(&config.models_root);
        let is_php = |path: &Path| path.extension().map_or(false, |ext| ext == "php");

        Ok(walk_files(&root, config.max_walk_depth, is_php)
            .iter()
            .flat_map(|file| Self::entries_for_file(file, config.relationship_lookahead))
            .collect())
    }
}

/// Relationships grouped by model, derived from the relationship index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipGraph {
    models: BTreeMap<String, Vec<Relationship>>,
}

impl RelationshipGraph {
    pub fn from_index(index: &SymbolIndex) -> Self {
        let mut models: BTreeMap<String, Vec<Relationship>> = BTreeMap::new();

        for entry in index.entries() {
            let (Some(model), Some(method), Some(kind)) = (entry.extra("model"), entry.extra("method"), entry.extra("kind"))
            else {
                continue;
            };
            models.entry(model.to_string()).or_default().push(Relationship {
                method: method.to_string(),
                kind: kind.to_string(),
                related: entry.extra("related").map(str::to_string),
                line: entry.line().unwrap_or(0),
            });
        }

        for relationships in models.values_mut() {
            relationships.sort_by_key(|r| r.line);
        }
        Self { models }
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn relationships(&self, model: &str) -> &[Relationship] {
        self.models.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Every relationship method name across all models, unique and sorted
    pub fn all_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self
            .models
            .values()
            .flatten()
            .map(|r| r.method.clone())
            .collect();
        methods.sort();
        methods.dedup();
        methods
    }

    /// Guess the model a variable holds: `$user`, `$users` → `User`,
    /// `$blogPost` → `BlogPost`, `$categories` → `Category`
    pub fn model_for_variable(&self, variable: &str) -> Option<&str> {
        let name = variable.trim_start_matches('$');
        let singular = if let Some(stem) = name.strip_suffix("ies") {
            format!("{}y", stem)
        } else if name.ends_with('s') && !name.ends_with("ss") {
            name[..name.len() - 1].to_string()
        } else {
            name.to_string()
        };

        let mut chars = singular.chars();
        let first = chars.next()?;
        let candidate: String = first.to_uppercase().chain(chars).collect();

        self.models
            .keys()
            .find(|model| model.as_str() == candidate)
            .or_else(|| self.models.keys().find(|model| model.eq_ignore_ascii_case(&candidate)))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const USER: &str = indoc! {r#"
        <?php

        namespace App\Models;

        class User extends Authenticatable
        {
            public function posts(): HasMany
            {
                return $this->hasMany(Post::class);
            }

            public function roles()
            {
                return $this->belongsToMany(
                    \App\Models\Role::class,
                    'role_user'
                );
            }

            public function imageable()
            {
                return $this->morphTo();
            }

            public function getNameAttribute($value)
            {
                return ucfirst($value);
            }
        }
    "#};

    #[test]
    fn test_scan_relationships() {
        let rels = scan_relationships(USER, 3);
        assert_eq!(rels.len(), 3);

        assert_eq!(rels[0].method, "posts");
        assert_eq!(rels[0].kind, "hasMany");
        assert_eq!(rels[0].related.as_deref(), Some("Post"));
        assert_eq!(rels[0].line, 6);

        assert_eq!(rels[1].method, "roles");
        assert_eq!(rels[1].kind, "belongsToMany");
        assert_eq!(rels[1].related.as_deref(), Some("Role"));

        assert_eq!(rels[2].method, "imageable");
        assert_eq!(rels[2].related, None);
    }

    #[test]
    fn test_lookahead_is_bounded() {
        let text = indoc! {r#"
            public function owner()
            {
                return $this->belongsTo(


                    Team::class
                );
            }
        "#};
        assert_eq!(scan_relationships(text, 2)[0].related, None);
        assert_eq!(scan_relationships(text, 3)[0].related.as_deref(), Some("Team"));
    }

    #[test]
    fn test_calls_outside_methods_are_ignored() {
        let text = "<?php\n// $this->hasMany(Post::class)\n$this->hasMany(Post::class);\n";
        assert!(scan_relationships(text, 3).is_empty());
    }

    #[test]
    fn test_model_for_variable() {
        let index = SymbolIndex::from_entries(vec![
            SymbolEntry::new("User.posts", Category::Relationship, "User.php")
                .with_extra("model", "User")
                .with_extra("method", "posts")
                .with_extra("kind", "hasMany"),
            SymbolEntry::new("BlogPost.author", Category::Relationship, "BlogPost.php")
                .with_extra("model", "BlogPost")
                .with_extra("method", "author")
                .with_extra("kind", "belongsTo"),
            SymbolEntry::new("Category.posts", Category::Relationship, "Category.php")
                .with_extra("model", "Category")
                .with_extra("method", "posts")
                .with_extra("kind", "hasMany"),
        ]);
        let graph = RelationshipGraph::from_index(&index);

        assert_eq!(graph.model_for_variable("$users"), Some("User"));
        assert_eq!(graph.model_for_variable("$blogPost"), Some("BlogPost"));
        assert_eq!(graph.model_for_variable("$categories"), Some("Category"));
        assert_eq!(graph.model_for_variable("$request"), None);
        assert_eq!(graph.all_methods(), vec!["author".to_string(), "posts".to_string()]);
    }
}
