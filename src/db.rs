use crate::error::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::{fs::create_dir_all, path::Path};
use tracing::info;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Opens a pool on the database file, creating its directory if needed.
///
/// The file itself is created by SQLite on first connect.
pub fn pool(db_path: &Path) -> Result<DbPool> {
    if let Some(dir) = db_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            info!(dir = %dir.display(), "Creating database directory");
            create_dir_all(dir)?;
        }
    }

    let manager = SqliteConnectionManager::file(db_path);
    // Single writer, sequential callers.
    Ok(Pool::builder().max_size(1).build(manager)?)
}
