use tracing::info;

use crate::db::Snippet;
use crate::error::AppResult;
use crate::services::snippets::SnippetRepository;

pub const DEFAULT_HISTORY_LIMIT: i64 = 15;

/// Parses a stored `history_limit`, falling back to the default.
pub fn resolve_history_limit(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(DEFAULT_HISTORY_LIMIT)
}

pub fn run_prune(repo: &SnippetRepository, history_limit: i64) -> AppResult<Vec<Snippet>> {
    let pruned = repo.enforce_history_limit(history_limit)?;
    if !pruned.is_empty() {
        info!(
            "history limit ({history_limit}) exceeded, evicted {} oldest snippet(s)",
            pruned.len()
        );
    }
    Ok(pruned)
}
