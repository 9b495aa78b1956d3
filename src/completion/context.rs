//! Cursor context detection
//!
//! Given one line of source and a cursor (byte offset), decide what the user
//! is typing:
//!
//! 1. **Whole call**: the cursor sits inside a complete helper call such as
//!    `route('home')`. When calls nest, the innermost one wins.
//! 2. **Trailing partial**: the text before the cursor ends in an unterminated
//!    helper argument, e.g. `config('app.na`.
//! 3. **Static method**: `Cache::rem` before the cursor.
//! 4. **Fluent chain**: `$user->po` before the cursor.
//!
//! Detection is single-line; a call whose argument is on a following line
//! is not recognised.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::symbols::Category;

/// A helper call spelling and the category its argument names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelperSpelling {
    pub name: &'static str,
    pub category: Category,
    /// The symbol is not the first argument (`@includeWhen($cond, 'view')`,
    /// `Route::view('/uri', 'view')`)
    pub leading_args: bool,
}

const fn helper(name: &'static str, category: Category) -> HelperSpelling {
    HelperSpelling { name, category, leading_args: false }
}

/// Recognised helper spellings; on ties the earlier spelling wins
pub const HELPERS: &[HelperSpelling] = &[
    helper("route", Category::Route),
    helper("to_route", Category::Route),
    helper("->route", Category::Route),
    helper("URL::route", Category::Route),
    helper("Route::has", Category::Route),
    HelperSpelling { name: "Route::view", category: Category::View, leading_args: true },
    helper("view", Category::View),
    helper("View::make", Category::View),
    helper("Inertia::render", Category::View),
    helper("inertia", Category::View),
    helper("@include", Category::View),
    helper("@extends", Category::View),
    helper("@includeIf", Category::View),
    helper("@each", Category::View),
    helper("@component", Category::View),
    HelperSpelling { name: "@includeWhen", category: Category::View, leading_args: true },
    HelperSpelling { name: "@includeUnless", category: Category::View, leading_args: true },
    helper("config", Category::Config),
    helper("Config::get", Category::Config),
    helper("__", Category::Translation),
    helper("trans", Category::Translation),
    helper("trans_choice", Category::Translation),
    helper("Lang::get", Category::Translation),
    helper("@lang", Category::Translation),
    helper("env", Category::Env),
    helper("Env::get", Category::Env),
];

/// What kind of completion the cursor is in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextType {
    Helper { category: Category },
    StaticMethod { class: String },
    FluentChain { variable: String },
}

/// The detected context around a cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionContext {
    pub context_type: ContextType,
    /// For whole calls the full argument, otherwise the text typed so far
    pub partial_text: String,
    /// Byte offset of the first character of the partial
    pub match_start: usize,
    pub cursor_offset_in_match: usize,
}

impl CompletionContext {
    pub fn category(&self) -> Option<Category> {
        match self.context_type {
            ContextType::Helper { category } => Some(category),
            _ => None,
        }
    }
}

struct HelperPatterns {
    spelling: HelperSpelling,
    whole: Regex,
    trailing: Regex,
}

// Literal bodies, honouring backslash escapes
const SQ_BODY: &str = r"(?:[^'\\]|\\.)*";
const DQ_BODY: &str = r#"(?:[^"\\]|\\.)*"#;

static PATTERNS: Lazy<Vec<HelperPatterns>> = Lazy::new(|| {
    HELPERS
        .iter()
        .map(|spelling| {
            let name = regex::escape(spelling.name);
            // Earlier arguments may themselves be string literals
            let leading = if spelling.leading_args {
                format!(r#"(?:[^'"]|'{}'|"{}")*?,\s*"#, SQ_BODY, DQ_BODY)
            } else {
                String::new()
            };
            let whole = format!(
                r#"{}\s*(?P<open>\()\s*{}(?:'(?P<sq>{})'|"(?P<dq>{})")"#,
                name, leading, SQ_BODY, DQ_BODY
            );
            let trailing = format!(
                r#"{}\s*\(\s*{}(?:'(?P<sq>{}\\?)|"(?P<dq>{}\\?))$"#,
                name, leading, SQ_BODY, DQ_BODY
            );
            HelperPatterns {
                spelling: *spelling,
                whole: Regex::new(&whole).expect("valid helper pattern"),
                trailing: Regex::new(&trailing).expect("valid trailing helper pattern"),
            }
        })
        .collect()
});

static STATIC_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<class>\\?[A-Za-z_][A-Za-z0-9_]*(?:\\[A-Za-z_][A-Za-z0-9_]*)*)::(?P<partial>[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid static method pattern")
});

static FLUENT_CHAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?P<variable>[A-Za-z_][A-Za-z0-9_]*)\s*->\s*(?P<partial>[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid fluent chain pattern")
});

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// A spelling that starts with an identifier must not continue one
/// (`to_route` is not `route`, `getenv` is not `env`)
fn starts_a_call(line: &str, start: usize, spelling: &HelperSpelling) -> bool {
    let starts_with_identifier = spelling.name.chars().next().map_or(false, is_identifier_char);
    !starts_with_identifier || !line[..start].chars().next_back().map_or(false, is_identifier_char)
}

/// Offset of the `)` closing the call opened at `open`, or the line length
fn closing_paren(line: &str, open: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in line[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return open + offset;
                }
            }
            _ => {}
        }
    }
    line.len()
}

fn clamp_cursor(line: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(line.len());
    while !line.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

fn helper_context(category: Category, partial: &str, match_start: usize, cursor: usize) -> CompletionContext {
    CompletionContext {
        context_type: ContextType::Helper { category },
        partial_text: partial.to_string(),
        match_start,
        cursor_offset_in_match: cursor.saturating_sub(match_start),
    }
}

fn whole_call(line: &str, cursor: usize) -> Option<CompletionContext> {
    // Keyed by open paren offset; ties keep the earlier spelling
    let mut best: Option<(usize, CompletionContext)> = None;

    for patterns in PATTERNS.iter() {
        for caps in patterns.whole.captures_iter(line) {
            let (Some(whole), Some(open), Some(content)) =
                (caps.get(0), caps.name("open"), caps.name("sq").or_else(|| caps.name("dq")))
            else {
                continue;
            };
            if !starts_a_call(line, whole.start(), &patterns.spelling) {
                continue;
            }
            let open = open.start();
            if !(open < cursor && cursor <= closing_paren(line, open)) {
                continue;
            }
            if best.as_ref().map_or(true, |(best_open, _)| open > *best_open) {
                let context = helper_context(patterns.spelling.category, content.as_str(), content.start(), cursor);
                best = Some((open, context));
            }
        }
    }

    best.map(|(_, context)| context)
}

fn trailing_partial(prefix: &str, cursor: usize) -> Option<CompletionContext> {
    let mut best: Option<(usize, CompletionContext)> = None;

    for patterns in PATTERNS.iter() {
        let Some(caps) = patterns.trailing.captures(prefix) else {
            continue;
        };
        let (Some(whole), Some(content)) = (caps.get(0), caps.name("sq").or_else(|| caps.name("dq"))) else {
            continue;
        };
        if !starts_a_call(prefix, whole.start(), &patterns.spelling) {
            continue;
        }
        if best.as_ref().map_or(true, |(start, _)| content.start() > *start) {
            let context = helper_context(patterns.spelling.category, content.as_str(), content.start(), cursor);
            best = Some((content.start(), context));
        }
    }

    best.map(|(_, context)| context)
}

fn member_context(prefix: &str, cursor: usize) -> Option<CompletionContext> {
    if let Some(caps) = STATIC_METHOD.captures(prefix) {
        let class = caps.name("class")?.as_str();
        let class = class.rsplit('\\').next().unwrap_or(class).to_string();
        let (partial, start) = caps.name("partial").map_or(("", cursor), |m| (m.as_str(), m.start()));
        return Some(CompletionContext {
            context_type: ContextType::StaticMethod { class },
            partial_text: partial.to_string(),
            match_start: start,
            cursor_offset_in_match: cursor - start,
        });
    }

    let caps = FLUENT_CHAIN.captures(prefix)?;
    let variable = caps.name("variable")?.as_str().to_string();
    let (partial, start) = caps.name("partial").map_or(("", cursor), |m| (m.as_str(), m.start()));
    Some(CompletionContext {
        context_type: ContextType::FluentChain { variable },
        partial_text: partial.to_string(),
        match_start: start,
        cursor_offset_in_match: cursor - start,
    })
}

/// Detect the completion context at byte offset `cursor` in `line`
pub fn detect(line: &str, cursor: usize) -> Option<CompletionContext> {
    let cursor = clamp_cursor(line, cursor);
    let prefix = &line[..cursor];

    whole_call(line, cursor)
        .or_else(|| trailing_partial(prefix, cursor))
        .or_else(|| member_context(prefix, cursor))
}
