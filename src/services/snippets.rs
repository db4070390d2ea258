use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::db::{Database, Snippet, SnippetRow};
use crate::error::{from_db, AppError, AppResult};
use crate::hotkey::Combo;
use crate::utils::text::{derive_label, truncate_label};

const SAMPLE_LABEL: &str = "Sample Snippet";
const SAMPLE_CONTENT: &str = "This is a sample snippet.";
const SAMPLE_HOTKEY: &str = "ctrl+shift+1";

/// User- or clipboard-supplied fields for a snippet, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnippetDraft {
    pub label: String,
    pub content: String,
    pub tags: Option<String>,
    pub group: Option<String>,
    pub hotkey: Option<String>,
}

impl SnippetDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.hotkey = Some(hotkey.into());
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

struct Validated {
    label: String,
    content: String,
    tags: Option<String>,
    group: Option<String>,
    hotkey: Option<String>,
}

impl Validated {
    fn row(&self) -> SnippetRow<'_> {
        SnippetRow {
            label: &self.label,
            content: &self.content,
            tags: self.tags.as_deref(),
            group: self.group.as_deref(),
            hotkey: self.hotkey.as_deref(),
        }
    }
}

fn validate(draft: &SnippetDraft) -> AppResult<Validated> {
    if draft.content.trim().is_empty() {
        return Err(AppError::Validation(
            "snippet content cannot be empty".to_string(),
        ));
    }

    let label = match draft.label.trim() {
        "" => derive_label(&draft.content),
        given => truncate_label(given),
    };

    let hotkey = match draft.hotkey.as_deref() {
        Some(raw) => Combo::normalize(raw)
            .map_err(|err| AppError::Validation(err.to_string()))?
            .map(|combo| combo.to_string()),
        None => None,
    };

    Ok(Validated {
        label,
        content: draft.content.clone(),
        tags: non_blank(draft.tags.as_deref()),
        group: non_blank(draft.group.as_deref()),
        hotkey,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// CRUD over snippets plus the history-eviction policy.
pub struct SnippetRepository {
    db: Arc<Database>,
}

impl SnippetRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn add(&self, draft: &SnippetDraft) -> AppResult<i64> {
        let validated = validate(draft)?;
        let snippet = self.db.insert_snippet(validated.row()).map_err(from_db)?;
        Ok(snippet.id)
    }

    pub fn get(&self, id: i64) -> AppResult<Snippet> {
        self.db.get_snippet(id)?.ok_or(AppError::NotFound(id))
    }

    /// Pinned first, then newest first.
    pub fn get_all(&self) -> AppResult<Vec<Snippet>> {
        Ok(self.db.list_snippets()?)
    }

    pub fn update(&self, id: i64, draft: &SnippetDraft) -> AppResult<Snippet> {
        let validated = validate(draft)?;
        self.db
            .update_snippet(id, validated.row())
            .map_err(from_db)?
            .ok_or(AppError::NotFound(id))
    }

    pub fn delete(&self, id: i64) -> AppResult<()> {
        self.db
            .delete_snippet(id)?
            .map(|_| ())
            .ok_or(AppError::NotFound(id))
    }

    pub fn delete_many(&self, ids: &[i64]) -> AppResult<Vec<Snippet>> {
        Ok(self.db.delete_snippets_by_ids(ids)?)
    }

    pub fn set_pinned(&self, id: i64, pinned: bool) -> AppResult<Snippet> {
        self.db.set_pinned(id, pinned)?.ok_or(AppError::NotFound(id))
    }

    /// Deletes the oldest unpinned, hotkey-less snippets until at most `limit`
    /// of them remain. A `limit` of zero or less evicts all of them.
    pub fn enforce_history_limit(&self, limit: i64) -> AppResult<Vec<Snippet>> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let ids = self.db.evictable_ids()?;
        if ids.len() <= limit {
            return Ok(Vec::new());
        }

        let overflow = ids.len() - limit;
        self.delete_many(&ids[..overflow])
    }

    /// Inserts the starter snippet on a brand new store.
    pub fn seed_if_empty(&self) -> AppResult<bool> {
        if self.db.count_snippets()? > 0 {
            return Ok(false);
        }
        let draft = SnippetDraft::new(SAMPLE_CONTENT)
            .label(SAMPLE_LABEL)
            .hotkey(SAMPLE_HOTKEY);
        self.add(&draft)?;
        info!("seeded empty store with a sample snippet");
        Ok(true)
    }
}
