//! SQLite index file.
//!
//! ```sql
//! index_meta(key TEXT PRIMARY KEY, value TEXT NOT NULL)
//! chunks(position INTEGER PRIMARY KEY, chunk_id INTEGER, text TEXT,
//!        source_file TEXT, embedding BLOB)
//! ```
//!
//! `index_meta` holds `version`, `model_name` and `dims`. Vectors are
//! little-endian `f32` blobs. A save rewrites both tables inside one
//! transaction.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use mailrag_core::embedding::{blob_to_vec, vec_to_blob};
use mailrag_core::error::{Error, Result};
use mailrag_core::models::{Chunk, Index};
use mailrag_core::store::IndexStore;

use super::INDEX_FORMAT_VERSION;

pub struct SqliteIndexStore {
    path: PathBuf,
}

impl SqliteIndexStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn connect(&self, create: bool) -> Result<SqlitePool> {
        if create {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        } else if tokio::fs::metadata(&self.path).await.is_err() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("index file not found: {}", self.path.display()),
            )));
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", self.path.display()))
            .map_err(storage)?
            .create_if_missing(create)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(open_error)
    }
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    async fn save(&self, index: &Index) -> Result<()> {
        index.validate()?;
        let pool = self.connect(true).await?;
        let result = write_index(&pool, index).await;
        pool.close().await;
        result?;

        info!(path = %self.path.display(), chunks = index.len(), "saved SQLite index");
        Ok(())
    }

    async fn load(&self) -> Result<Index> {
        let pool = self.connect(false).await?;
        let result = read_index(&pool).await;
        pool.close().await;
        let index = result?;

        info!(path = %self.path.display(), chunks = index.len(), "loaded SQLite index");
        Ok(index)
    }
}

async fn write_index(pool: &SqlitePool, index: &Index) -> Result<()> {
    let mut tx = pool.begin().await.map_err(storage)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await
    .map_err(storage)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            position INTEGER PRIMARY KEY,
            chunk_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            source_file TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await
    .map_err(storage)?;

    sqlx::query("DELETE FROM chunks")
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
    sqlx::query("DELETE FROM index_meta")
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

    let dims = index.dims().map(|d| d.to_string()).unwrap_or_default();
    let meta = [
        ("version", INDEX_FORMAT_VERSION.to_string()),
        ("model_name", index.model_name.clone()),
        ("dims", dims),
    ];
    for (key, value) in meta {
        sqlx::query("INSERT INTO index_meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
    }

    for (position, chunk) in index.chunks.iter().enumerate() {
        let embedding = chunk.embedding.as_deref().unwrap_or_default();
        sqlx::query(
            "INSERT INTO chunks (position, chunk_id, text, source_file, embedding) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(position as i64)
        .bind(chunk.chunk_id as i64)
        .bind(&chunk.text)
        .bind(&chunk.source_file)
        .bind(vec_to_blob(embedding))
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
    }

    tx.commit().await.map_err(storage)?;
    Ok(())
}

async fn read_index(pool: &SqlitePool) -> Result<Index> {
    let meta_rows = sqlx::query("SELECT key, value FROM index_meta")
        .fetch_all(pool)
        .await
        .map_err(corrupt_or_storage)?;

    let mut version = None;
    let mut model_name = None;
    let mut dims = None;
    for row in &meta_rows {
        let key: String = row.try_get("key").map_err(corrupt_or_storage)?;
        let value: String = row.try_get("value").map_err(corrupt_or_storage)?;
        match key.as_str() {
            "version" => version = Some(value),
            "model_name" => model_name = Some(value),
            "dims" => dims = Some(value),
            _ => {}
        }
    }

    let version = version.ok_or_else(|| Error::corrupt("index_meta has no version"))?;
    if version != INDEX_FORMAT_VERSION.to_string() {
        return Err(Error::corrupt(format!(
            "unsupported index version {} (expected {})",
            version, INDEX_FORMAT_VERSION
        )));
    }
    let model_name = model_name.ok_or_else(|| Error::corrupt("index_meta has no model_name"))?;

    let rows = sqlx::query(
        "SELECT chunk_id, text, source_file, embedding FROM chunks ORDER BY position",
    )
    .fetch_all(pool)
    .await
    .map_err(corrupt_or_storage)?;

    let mut chunks = Vec::with_capacity(rows.len());
    for row in &rows {
        let chunk_id: i64 = row.try_get("chunk_id").map_err(corrupt_or_storage)?;
        let blob: Vec<u8> = row.try_get("embedding").map_err(corrupt_or_storage)?;
        chunks.push(Chunk {
            chunk_id: usize::try_from(chunk_id)
                .map_err(|_| Error::corrupt(format!("negative chunk_id {}", chunk_id)))?,
            text: row.try_get("text").map_err(corrupt_or_storage)?,
            source_file: row.try_get("source_file").map_err(corrupt_or_storage)?,
            embedding: Some(blob_to_vec(&blob)?),
        });
    }

    let index = Index::new(model_name, chunks);
    index.validate()?;

    if let (Some(declared), Some(actual)) = (dims.filter(|d| !d.is_empty()), index.dims()) {
        if declared != actual.to_string() {
            return Err(Error::corrupt(format!(
                "index declares {} dimensions but vectors have {}",
                declared, actual
            )));
        }
    }

    Ok(index)
}

fn storage(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

/// SQLITE_CORRUPT and SQLITE_NOTADB primary result codes.
const CORRUPT_CODES: [i32; 2] = [11, 26];

/// An existing file that SQLite refuses to read is a damaged index.
fn open_error(e: sqlx::Error) -> Error {
    let unreadable = match &e {
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| CORRUPT_CODES.contains(&(code & 0xff))),
        _ => false,
    };
    if unreadable {
        Error::corrupt(e.to_string())
    } else {
        storage(e)
    }
}

/// Schema and decoding problems mean the file is not a valid index.
fn corrupt_or_storage(e: sqlx::Error) -> Error {
    match e {
        sqlx::Error::Database(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => Error::corrupt(e.to_string()),
        other => Error::Storage(other.to_string()),
    }
}
