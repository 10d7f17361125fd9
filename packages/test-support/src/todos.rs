//! Factories for `todos` rows.

use migration::entities::todos::{ActiveModel, TagList};

/// Unsaved todo with a fresh id.
pub fn new_todo(title: impl Into<String>, tags: &[&str]) -> ActiveModel {
    ActiveModel::create(title, tags.iter().copied().collect::<TagList>())
}

/// `count` unsaved todos titled `{prefix} #{n}` with no tags.
pub fn todo_batch(prefix: &str, count: usize) -> Vec<ActiveModel> {
    (0..count)
        .map(|n| new_todo(format!("{prefix} #{n}"), &[]))
        .collect()
}
