use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use spec_rag_core::error::RagError;

/// Open the SQLite database at `path`.
///
/// With `create == false` a missing file is reported as
/// [`RagError::MissingIndex`] instead of silently creating an empty index.
pub async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    if !create && !path.exists() {
        return Err(RagError::MissingIndex {
            path: path.display().to_string(),
        }
        .into());
    }

    if create {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database {}", path.display()))?;

    Ok(pool)
}
