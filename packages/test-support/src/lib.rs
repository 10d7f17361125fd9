//! Shared helpers for tests: logging bootstrap, unique values, todo factories.

pub mod logging;
pub mod todos;

pub use todos::{new_todo, todo_batch};

use ulid::Ulid;

/// Generate a unique string in the format `{prefix}-{ulid}`.
///
/// # Examples
/// ```
/// use test_support::unique_str;
///
/// let id1 = unique_str("todo");
/// let id2 = unique_str("todo");
/// assert_ne!(id1, id2);
/// assert!(id1.starts_with("todo-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}

/// Unique path for a throwaway SQLite file inside `dir`.
pub fn unique_db_path(dir: &std::path::Path) -> std::path::PathBuf {
    dir.join(format!("{}.db", unique_str("sealite")))
}
