//! SQLite-based metadata store.

use crate::error::{MetadataError, MetadataResult};
use crate::store::MetadataStore;
use async_trait::async_trait;
use larder_core::record::{FileRecord, ListFilter, NewFileRecord, RecordPatch};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace TEXT NOT NULL,
    md5 TEXT NOT NULL,
    file_name TEXT NOT NULL,
    description TEXT,
    length INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    image_format TEXT,
    image_width INTEGER,
    image_height INTEGER,
    version TEXT NOT NULL DEFAULT 'original',
    original_id INTEGER REFERENCES files(id) ON DELETE CASCADE,
    created TEXT NOT NULL
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_files_namespace ON files(namespace)",
    "CREATE INDEX IF NOT EXISTS idx_files_namespace_md5 ON files(namespace, md5)",
    "CREATE INDEX IF NOT EXISTS idx_files_original_id ON files(original_id)",
];

/// SQLite-backed metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) a database file and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under
            // concurrent access.
            .busy_timeout(Duration::from_secs(5));

        Self::with_options(opts).await
    }

    /// An in-memory database, mainly for tests.
    pub async fn in_memory() -> MetadataResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        Self::with_options(opts).await
    }

    async fn with_options(opts: SqliteConnectOptions) -> MetadataResult<Self> {
        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures and keeps an
            // in-memory database alive.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

/// Database row for one file record.
#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    namespace: String,
    md5: String,
    file_name: String,
    description: Option<String>,
    length: i64,
    mime_type: String,
    image_format: Option<String>,
    image_width: Option<i64>,
    image_height: Option<i64>,
    version: String,
    original_id: Option<i64>,
    created: OffsetDateTime,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        FileRecord {
            id: row.id,
            namespace: row.namespace,
            md5: row.md5,
            created: row.created,
            file_name: row.file_name,
            description: row.description,
            href: None,
            image_format: row.image_format,
            image_width: row.image_width,
            image_height: row.image_height,
            length: row.length,
            mime_type: row.mime_type,
            original_id: row.original_id,
            version: row.version,
            versions: Vec::new(),
        }
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn create(&self, record: &NewFileRecord) -> MetadataResult<FileRecord> {
        let created = OffsetDateTime::now_utc();
        let result = sqlx::query(
            r#"
            INSERT INTO files (
                namespace, md5, file_name, description, length, mime_type,
                image_format, image_width, image_height, version, original_id,
                created
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.namespace)
        .bind(&record.md5)
        .bind(&record.file_name)
        .bind(&record.description)
        .bind(record.length)
        .bind(&record.mime_type)
        .bind(&record.image_format)
        .bind(record.image_width)
        .bind(record.image_height)
        .bind(&record.version)
        .bind(record.original_id)
        .bind(created)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await?.ok_or_else(|| {
            MetadataError::Internal(format!("record {id} vanished right after insert"))
        })
    }

    async fn get(&self, id: i64) -> MetadataResult<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(FileRecord::from))
    }

    async fn update(&self, id: i64, patch: &RecordPatch) -> MetadataResult<FileRecord> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("file #{id} does not exist")))?;

        let file_name = patch.file_name.clone().unwrap_or(current.file_name);
        let description = patch.description.clone().or(current.description);

        sqlx::query("UPDATE files SET file_name = ?, description = ? WHERE id = ?")
            .bind(&file_name)
            .bind(&description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get(id)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("file #{id} does not exist")))
    }

    async fn delete(&self, id: i64) -> MetadataResult<()> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, namespace: &str, filter: &ListFilter) -> MetadataResult<Vec<FileRecord>> {
        let mut sql = String::from("SELECT * FROM files WHERE namespace = ?");
        if filter.file_name.is_some() {
            sql.push_str(" AND file_name = ?");
        }
        if filter.mime_type.is_some() {
            sql.push_str(" AND mime_type = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query_as::<_, FileRow>(&sql).bind(namespace);
        if let Some(file_name) = &filter.file_name {
            query = query.bind(file_name);
        }
        if let Some(mime_type) = &filter.mime_type {
            query = query.bind(mime_type);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn find_by_hash(
        &self,
        namespace: &str,
        md5: &str,
    ) -> MetadataResult<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(
            "SELECT * FROM files WHERE namespace = ? AND md5 = ? ORDER BY id LIMIT 1",
        )
        .bind(namespace)
        .bind(md5)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(FileRecord::from))
    }

    async fn list_derivatives(&self, original_id: i64) -> MetadataResult<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(
            "SELECT * FROM files WHERE original_id = ? ORDER BY image_width",
        )
        .bind(original_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(CREATE_FILES_TABLE).execute(&self.pool).await?;
        for statement in CREATE_INDEXES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
