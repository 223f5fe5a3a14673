//! Named, durable index snapshots.
//!
//! Each snapshot is one SQLite database at
//! `<data_dir>/indexes/<name>/index.sqlite` holding the metadata, the source
//! fingerprints and every chunk with its embedding as little-endian `f32`
//! bytes. Writes go to `index.sqlite.tmp` first and are renamed into place,
//! so a reader sees either the old snapshot or the new one.

use crate::config::{get_indexes_dir, get_snapshot_dir, get_snapshot_path};
use crate::types::{Chunk, SnapshotMeta, SnapshotStats, SourceRecord};
use crate::vector_index::{FlatIndex, IndexEntry, VectorIndex};
use chrono::{DateTime, Utc};
use manualqa_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const SCHEMA_VERSION: &str = "1";
const TMP_FILE_NAME: &str = "index.sqlite.tmp";

const SCHEMA: &str = r#"
    CREATE TABLE meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE sources (
        position INTEGER PRIMARY KEY,
        path TEXT NOT NULL,
        sha256 TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        chunk_count INTEGER NOT NULL
    );

    CREATE TABLE chunks (
        id INTEGER PRIMARY KEY,
        source TEXT NOT NULL,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL
    );
"#;

/// Reject names that would escape the indexes directory.
fn validate_name(name: &str) -> AppResult<()> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(AppError::InvalidInput(format!(
            "invalid snapshot name: {:?}",
            name
        )));
    }
    Ok(())
}

/// Write `index` under `name`, replacing any earlier snapshot of that name.
///
/// Returns the path of the snapshot database.
pub fn persist(
    data_dir: &Path,
    name: &str,
    index: &FlatIndex,
    meta: &SnapshotMeta,
) -> AppResult<PathBuf> {
    validate_name(name)?;

    let dir = get_snapshot_dir(data_dir, name);
    fs::create_dir_all(&dir)?;

    let tmp_path = dir.join(TMP_FILE_NAME);
    let final_path = get_snapshot_path(data_dir, name);

    if tmp_path.exists() {
        fs::remove_file(&tmp_path)?;
    }

    let written = write_database(&tmp_path, index, meta)
        .and_then(|()| fs::File::open(&tmp_path)?.sync_all().map_err(AppError::from))
        .and_then(|()| fs::rename(&tmp_path, &final_path).map_err(AppError::from));

    if let Err(e) = written {
        if tmp_path.exists() {
            let _ = fs::remove_file(&tmp_path);
        }
        return Err(e);
    }

    tracing::info!(
        "Persisted snapshot '{}' ({} chunks, dim {}) to {:?}",
        name,
        index.len(),
        index.dimension(),
        final_path
    );
    Ok(final_path)
}

fn write_database(path: &Path, index: &FlatIndex, meta: &SnapshotMeta) -> AppResult<()> {
    let mut conn = Connection::open(path).map_err(write_error)?;
    conn.execute_batch(SCHEMA).map_err(write_error)?;

    let tx = conn.transaction().map_err(write_error)?;
    {
        let meta_rows: [(&str, String); 9] = [
            ("schema_version", SCHEMA_VERSION.to_string()),
            ("name", meta.name.clone()),
            ("dataset", meta.dataset.clone()),
            ("provider", meta.provider.clone()),
            ("model", meta.model.clone()),
            ("dimension", index.dimension().to_string()),
            ("chunk_size", meta.chunk_size.to_string()),
            ("chunk_overlap", meta.chunk_overlap.to_string()),
            ("created_at", meta.created_at.to_rfc3339()),
        ];
        let mut stmt = tx
            .prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")
            .map_err(write_error)?;
        for (key, value) in &meta_rows {
            stmt.execute(params![key, value]).map_err(write_error)?;
        }

        let mut stmt = tx
            .prepare(
                "INSERT INTO sources (position, path, sha256, size_bytes, chunk_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(write_error)?;
        for (position, source) in meta.sources.iter().enumerate() {
            stmt.execute(params![
                position as i64,
                source.path,
                source.sha256,
                source.size_bytes as i64,
                source.chunk_count as i64,
            ])
            .map_err(write_error)?;
        }

        let mut stmt = tx
            .prepare(
                "INSERT INTO chunks (id, source, position, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(write_error)?;
        for entry in index.entries() {
            stmt.execute(params![
                entry.chunk.id as i64,
                entry.chunk.source,
                entry.chunk.position as i64,
                entry.chunk.text,
                embedding_to_bytes(&entry.vector),
            ])
            .map_err(write_error)?;
        }
    }
    tx.commit().map_err(write_error)?;

    conn.close().map_err(|(_, e)| write_error(e))
}

fn write_error(e: rusqlite::Error) -> AppError {
    AppError::IndexBuild(format!("failed to write snapshot: {}", e))
}

/// Whether a snapshot named `name` exists.
pub fn exists(data_dir: &Path, name: &str) -> bool {
    validate_name(name).is_ok() && get_snapshot_path(data_dir, name).is_file()
}

/// Names of every persisted snapshot, sorted.
pub fn list(data_dir: &Path) -> AppResult<Vec<String>> {
    let dir = get_indexes_dir(data_dir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if exists(data_dir, name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Load the snapshot named `name`.
///
/// # Errors
/// - `AppError::IndexNotFound` if no snapshot has that name
/// - `AppError::IndexCorrupt` if the database is unreadable or its vectors
///   do not match the recorded dimension
pub fn load(data_dir: &Path, name: &str) -> AppResult<(FlatIndex, SnapshotMeta)> {
    let conn = open_existing(data_dir, name)?;
    let meta = read_meta(&conn, name)?;

    let mut stmt = conn
        .prepare("SELECT id, source, position, text, embedding FROM chunks ORDER BY id")
        .map_err(|e| corrupt(name, e))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })
        .map_err(|e| corrupt(name, e))?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, source, position, text, blob) = row.map_err(|e| corrupt(name, e))?;
        if blob.len() != meta.dimension * 4 {
            return Err(AppError::IndexCorrupt(format!(
                "{}: chunk {} has {} embedding bytes, expected {}",
                name,
                id,
                blob.len(),
                meta.dimension * 4
            )));
        }

        entries.push(IndexEntry {
            chunk: Chunk {
                id: to_usize(id, name)?,
                source,
                position: to_usize(position, name)?,
                text,
            },
            vector: bytes_to_embedding(&blob),
        });
    }

    if entries.is_empty() {
        return Err(AppError::IndexCorrupt(format!("{}: snapshot has no chunks", name)));
    }

    let index = FlatIndex::from_entries(meta.dimension, entries)
        .map_err(|e| AppError::IndexCorrupt(format!("{}: {}", name, e)))?;

    tracing::debug!(
        "Loaded snapshot '{}' ({} chunks, dim {})",
        name,
        index.len(),
        index.dimension()
    );
    Ok((index, meta))
}

/// Counts, size and provenance of a persisted snapshot.
pub fn stats(data_dir: &Path, name: &str) -> AppResult<SnapshotStats> {
    let conn = open_existing(data_dir, name)?;
    let meta = read_meta(&conn, name)?;

    let chunks_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
        .map_err(|e| corrupt(name, e))?;
    let db_size_bytes = fs::metadata(get_snapshot_path(data_dir, name))?.len();

    Ok(SnapshotStats {
        name: meta.name,
        dataset: meta.dataset,
        sources_count: meta.sources.len(),
        chunks_count: to_usize(chunks_count, name)?,
        dimension: meta.dimension,
        provider: meta.provider,
        model: meta.model,
        db_size_bytes,
        created_at: meta.created_at,
    })
}

fn open_existing(data_dir: &Path, name: &str) -> AppResult<Connection> {
    validate_name(name)?;

    let path = get_snapshot_path(data_dir, name);
    if !path.is_file() {
        return Err(AppError::IndexNotFound(name.to_string()));
    }

    Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| corrupt(name, e))
}

fn read_meta(conn: &Connection, name: &str) -> AppResult<SnapshotMeta> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM meta")
        .map_err(|e| corrupt(name, e))?;
    let values: HashMap<String, String> = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| corrupt(name, e))?
        .collect::<Result<_, _>>()
        .map_err(|e| corrupt(name, e))?;

    let get = |key: &str| -> AppResult<String> {
        values.get(key).cloned().ok_or_else(|| {
            AppError::IndexCorrupt(format!("{}: missing '{}' in snapshot metadata", name, key))
        })
    };
    let get_usize = |key: &str| -> AppResult<usize> {
        get(key)?.parse::<usize>().map_err(|e| {
            AppError::IndexCorrupt(format!("{}: bad '{}' in snapshot metadata: {}", name, key, e))
        })
    };

    let dimension = get_usize("dimension")?;
    if dimension == 0 {
        return Err(AppError::IndexCorrupt(format!("{}: dimension is 0", name)));
    }

    let created_at = DateTime::parse_from_rfc3339(&get("created_at")?)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::IndexCorrupt(format!("{}: bad created_at: {}", name, e)))?;

    let mut stmt = conn
        .prepare(
            "SELECT path, sha256, size_bytes, chunk_count FROM sources ORDER BY position",
        )
        .map_err(|e| corrupt(name, e))?;
    let sources = stmt
        .query_map([], |row| {
            Ok(SourceRecord {
                path: row.get(0)?,
                sha256: row.get(1)?,
                size_bytes: row.get::<_, i64>(2)?.max(0) as u64,
                chunk_count: row.get::<_, i64>(3)?.max(0) as usize,
            })
        })
        .map_err(|e| corrupt(name, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| corrupt(name, e))?;

    Ok(SnapshotMeta {
        name: get("name")?,
        dataset: get("dataset")?,
        provider: get("provider")?,
        model: get("model")?,
        dimension,
        chunk_size: get_usize("chunk_size")?,
        chunk_overlap: get_usize("chunk_overlap")?,
        created_at,
        sources,
    })
}

fn corrupt(name: &str, e: rusqlite::Error) -> AppError {
    AppError::IndexCorrupt(format!("{}: {}", name, e))
}

fn to_usize(value: i64, name: &str) -> AppResult<usize> {
    usize::try_from(value)
        .map_err(|_| AppError::IndexCorrupt(format!("{}: negative value {}", name, value)))
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
