use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::db::{DbPool, StorageError};

/// Archive the database file as a `.tar.gz`. The WAL is checkpointed first so
/// the file on disk contains every committed bill.
pub async fn backup_database(
    pool: &DbPool,
    db_path: &Path,
    backup_path: &Path,
) -> Result<(), StorageError> {
    sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
        .execute(pool)
        .await?;

    if let Some(parent) = backup_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(backup_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = tar::Builder::new(encoder);

    let name = db_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("bills.db");
    archive.append_path_with_name(db_path, name)?;
    archive.into_inner()?.finish()?;

    tracing::info!(backup = %backup_path.display(), "database backed up");
    Ok(())
}

/// Unpack a backup archive onto `db_path`. Must run before a pool is opened
/// on the target path.
pub fn restore_database(backup_path: &Path, db_path: &Path) -> Result<(), StorageError> {
    let file = std::fs::File::open(backup_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut entries = archive.entries()?;
    let entry = entries
        .next()
        .ok_or_else(|| StorageError::Corrupt("empty backup archive".into()))?;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    entry?.unpack(db_path)?;

    tracing::info!(db = %db_path.display(), "database restored from backup");
    Ok(())
}
