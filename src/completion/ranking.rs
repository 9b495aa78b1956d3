//! Completion ranking
//!
//! The default mode keeps the index order and only filters, which keeps the
//! result predictable while typing. Relevance mode additionally groups exact,
//! prefix and substring matches.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    /// Case-insensitive substring filter in index order
    #[default]
    IndexOrder,
    /// Exact, then prefix, then substring matches; index order within a tier
    Relevance,
}

impl FromStr for RankingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" | "index_order" => Ok(RankingMode::IndexOrder),
            "relevance" => Ok(RankingMode::Relevance),
            other => Err(format!("unknown ranking mode '{}'", other)),
        }
    }
}

fn tier(name: &str, partial: &str) -> u8 {
    if name == partial {
        0
    } else if name.starts_with(partial) {
        1
    } else {
        2
    }
}

/// Filter and order `names` for `partial`
///
/// An empty partial returns every name unchanged. Ranking an already ranked
/// list with the same partial and mode returns it unchanged.
pub fn rank<I, S>(names: I, partial: &str, mode: RankingMode) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let needle = partial.to_lowercase();
    let mut ranked: Vec<String> = names
        .into_iter()
        .filter(|name| needle.is_empty() || name.as_ref().to_lowercase().contains(&needle))
        .map(|name| name.as_ref().to_string())
        .collect();

    if mode == RankingMode::Relevance && !needle.is_empty() {
        // Stable sort keeps index order within each tier
        ranked.sort_by_cached_key(|name| tier(&name.to_lowercase(), &needle));
    }
    ranked
}
