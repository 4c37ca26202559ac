//! # SQLite store
//!
//! This module implements the data mapping between the SQLite relational
//! model and the domain models. Thread membership lives in `thread_blogs`,
//! whose `blog_id` column is UNIQUE: the database, not the service, has the
//! final word on "a blog belongs to at most one thread".

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, error, info};

use domains::{
    BlogId, BlogRecord, BlogRegistry, BlogSequence, DomainError, DomainResult, PageRequest,
    Thread, ThreadId, ThreadRepository, UserDirectory, UserId, UserSummary,
};

const SCHEMA: &str = include_str!("schema.sql");

/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    ///
    /// # Developer Note
    /// Every connection to `sqlite::memory:` is its own database, so in-memory
    /// URLs are pinned to a single connection that never expires. File
    /// databases run in WAL mode so readers never wait on the writer.
    pub async fn connect(url: &str, max_connections: u32) -> DomainResult<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(storage_error)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url, "sqlite store ready");
        Ok(store)
    }

    /// Takes the write lock up front. A deferred transaction that reads
    /// first cannot upgrade its lock while another writer is active.
    async fn begin_write(&self) -> DomainResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(storage_error)
    }

    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    pub async fn upsert_user(&self, user: &UserSummary) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, first_name, last_name, avatar) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET username = excluded.username,
                first_name = excluded.first_name, last_name = excluded.last_name,
                avatar = excluded.avatar",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    pub async fn upsert_blog(&self, blog: &BlogRecord) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO blogs (id, author_id, title, slug, excerpt, cover_image, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET title = excluded.title, slug = excluded.slug,
                excerpt = excluded.excerpt, cover_image = excluded.cover_image,
                status = excluded.status",
        )
        .bind(blog.id.to_string())
        .bind(blog.author_id.to_string())
        .bind(&blog.title)
        .bind(&blog.slug)
        .bind(&blog.excerpt)
        .bind(&blog.cover_image)
        .bind(blog.status.as_str())
        .bind(blog.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn load_members(&self, thread_id: &str) -> DomainResult<BlogSequence> {
        let rows = sqlx::query("SELECT blog_id FROM thread_blogs WHERE thread_id = ? ORDER BY position ASC")
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        let ids = rows
            .iter()
            .map(|row| parse_id(&get::<String>(row, "blog_id")?))
            .collect::<DomainResult<Vec<BlogId>>>()?;
        BlogSequence::new(ids)
    }

    async fn hydrate(&self, row: &SqliteRow) -> DomainResult<Thread> {
        let id: String = get(row, "id")?;
        let blog_ids = self.load_members(&id).await?;
        let status: String = get(row, "status")?;
        Ok(Thread {
            id: parse_id(&id)?,
            title: get(row, "title")?,
            description: get(row, "description")?,
            author_id: parse_id(&get::<String>(row, "author_id")?)?,
            blog_ids,
            status: status.parse().map_err(DomainError::Internal)?,
            is_public: get(row, "is_public")?,
            created_at: get(row, "created_at")?,
            updated_at: get(row, "updated_at")?,
        })
    }

    async fn page_where(
        &self,
        clause: &str,
        author_id: Option<UserId>,
        page: PageRequest,
    ) -> DomainResult<(Vec<Thread>, u64)> {
        let count_sql = format!("SELECT COUNT(*) FROM threads WHERE {clause}");
        let list_sql = format!(
            "SELECT * FROM threads WHERE {clause} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let author = author_id.map(|id| id.to_string());

        let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut list = sqlx::query(&list_sql);
        if let Some(author) = &author {
            count = count.bind(author.clone());
            list = list.bind(author.clone());
        }
        let total = count.fetch_one(&self.pool).await.map_err(storage_error)?;
        let rows = list
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        let mut threads = Vec::with_capacity(rows.len());
        for row in &rows {
            threads.push(self.hydrate(row).await?);
        }
        Ok((threads, total.max(0) as u64))
    }
}

/// Replaces the membership rows of `thread` inside an open transaction.
async fn write_members(tx: &mut Transaction<'_, Sqlite>, thread: &Thread) -> DomainResult<()> {
    let thread_id = thread.id.to_string();
    sqlx::query("DELETE FROM thread_blogs WHERE thread_id = ?")
        .bind(&thread_id)
        .execute(&mut **tx)
        .await
        .map_err(storage_error)?;
    for (position, blog_id) in thread.blog_ids.iter().enumerate() {
        sqlx::query("INSERT INTO thread_blogs (thread_id, blog_id, position) VALUES (?, ?, ?)")
            .bind(&thread_id)
            .bind(blog_id.to_string())
            .bind(position as i64)
            .execute(&mut **tx)
            .await
            .map_err(storage_error)?;
    }
    Ok(())
}

#[async_trait]
impl ThreadRepository for SqliteStore {
    async fn insert(&self, mut thread: Thread) -> DomainResult<Thread> {
        let now = Utc::now();
        thread.created_at = now;
        thread.updated_at = now;

        let mut tx = self.begin_write().await?;
        sqlx::query(
            "INSERT INTO threads (id, title, description, author_id, status, is_public, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(thread.id.to_string())
        .bind(&thread.title)
        .bind(&thread.description)
        .bind(thread.author_id.to_string())
        .bind(thread.status.as_str())
        .bind(thread.is_public)
        .bind(thread.created_at)
        .bind(thread.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;
        write_members(&mut tx, &thread).await?;
        tx.commit().await.map_err(storage_error)?;

        debug!(thread = %thread.id, "inserted thread");
        Ok(thread)
    }

    async fn find_by_id(&self, id: ThreadId) -> DomainResult<Option<Thread>> {
        let row = sqlx::query("SELECT * FROM threads WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        match row {
            Some(row) => self.hydrate(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_by_blog_id(&self, blog_id: BlogId) -> DomainResult<Option<Thread>> {
        let holder: Option<String> =
            sqlx::query_scalar("SELECT thread_id FROM thread_blogs WHERE blog_id = ?")
                .bind(blog_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;
        match holder {
            Some(thread_id) => self.find_by_id(parse_id(&thread_id)?).await,
            None => Ok(None),
        }
    }

    async fn list_public(&self, page: PageRequest) -> DomainResult<(Vec<Thread>, u64)> {
        self.page_where("status = 'published' AND is_public = 1", None, page)
            .await
    }

    async fn list_by_author(
        &self,
        author_id: UserId,
        page: PageRequest,
    ) -> DomainResult<(Vec<Thread>, u64)> {
        self.page_where("author_id = ?", Some(author_id), page).await
    }

    async fn save(&self, mut thread: Thread) -> DomainResult<Thread> {
        let mut tx = self.begin_write().await?;

        let existing = sqlx::query("SELECT author_id, created_at FROM threads WHERE id = ?")
            .bind(thread.id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| DomainError::not_found("Thread", thread.id))?;
        thread.author_id = parse_id(&get::<String>(&existing, "author_id")?)?;
        thread.created_at = get(&existing, "created_at")?;
        thread.updated_at = Utc::now();

        sqlx::query(
            "UPDATE threads SET title = ?, description = ?, status = ?, is_public = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&thread.title)
        .bind(&thread.description)
        .bind(thread.status.as_str())
        .bind(thread.is_public)
        .bind(thread.updated_at)
        .bind(thread.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;
        write_members(&mut tx, &thread).await?;
        tx.commit().await.map_err(storage_error)?;
        Ok(thread)
    }

    async fn delete(&self, id: ThreadId) -> DomainResult<bool> {
        let id = id.to_string();
        let mut tx = self.begin_write().await?;
        sqlx::query("DELETE FROM thread_blogs WHERE thread_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        let deleted = sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?
            .rows_affected();
        tx.commit().await.map_err(storage_error)?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl BlogRegistry for SqliteStore {
    async fn find_blog(&self, id: BlogId) -> DomainResult<Option<BlogRecord>> {
        let row = sqlx::query("SELECT * FROM blogs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = get(&row, "status")?;
        Ok(Some(BlogRecord {
            id: parse_id(&get::<String>(&row, "id")?)?,
            author_id: parse_id(&get::<String>(&row, "author_id")?)?,
            title: get(&row, "title")?,
            slug: get(&row, "slug")?,
            excerpt: get(&row, "excerpt")?,
            cover_image: get(&row, "cover_image")?,
            status: status.parse().map_err(DomainError::Internal)?,
            created_at: get::<DateTime<Utc>>(&row, "created_at")?,
        }))
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn find_user(&self, id: UserId) -> DomainResult<Option<UserSummary>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(UserSummary {
            id: parse_id(&get::<String>(&row, "id")?)?,
            username: get(&row, "username")?,
            first_name: get(&row, "first_name")?,
            last_name: get(&row, "last_name")?,
            avatar: get(&row, "avatar")?,
        }))
    }
}

/// Unique violations surface as conflicts; everything else is internal.
fn storage_error(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DomainError::Conflict(db.message().to_string());
        }
    }
    error!(error = %err, "sqlite failure");
    DomainError::Internal(err.to_string())
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> DomainResult<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(storage_error)
}

fn parse_id<T>(raw: &str) -> DomainResult<T>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| DomainError::Internal(format!("corrupt id {raw:?}: {e}")))
}
