use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mysql::{
    params,
    prelude::{FromValue, Queryable},
    Opts, Pool, PooledConn, Row,
};

use crate::generate_truncated_uuid;
use crate::models::{
    Archive, ArchiveDraft, Comment, CommentDraft, PageContent, PageDraft, PageName, Post,
    PostDraft, Work, WorkDraft,
};
use crate::store::{BlogStore, StoreError};

const SCHEMA: &str = include_str!("../schema.sql");

const POST_COLUMNS: &str = "id, title, content, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, author, content, created_at";
const WORK_COLUMNS: &str = "id, title, content, category, tech_stack, links, status, duration, thumbnail, published, created_at, updated_at";
const ARCHIVE_COLUMNS: &str = "id, title, content, category, tags, rating, published, created_at, updated_at";
const PAGE_COLUMNS: &str = "page, title, content, sections, updated_at";

/// MySQL-backed store. The driver is blocking, so every call hops onto the
/// blocking pool with its own pooled connection.
#[derive(Clone)]
pub struct MySqlStore {
    pool: Pool,
}

impl MySqlStore {
    pub fn connect(db_url: &str) -> Result<Self, StoreError> {
        let connection_opts = Opts::from_url(db_url)
            .map_err(|e| StoreError::Decode(format!("invalid database url: {}", e)))?;
        let pool = Pool::new(connection_opts)?;
        Ok(Self { pool })
    }

    /// Creates missing tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        self.run(|conn| {
            for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                conn.query_drop(statement)?;
            }
            tracing::info!("database schema is up to date");
            Ok(())
        })
        .await
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PooledConn) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get_conn()?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl BlogStore for MySqlStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.run(|conn| {
            let result: Option<u8> = conn.query_first("SELECT 1")?;
            match result {
                Some(1) => Ok(()),
                other => Err(StoreError::Decode(format!("unexpected ping result {:?}", other))),
            }
        })
        .await
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.run(|conn| {
            let rows: Vec<Row> = conn.query(format!(
                "SELECT {} FROM posts ORDER BY created_at DESC",
                POST_COLUMNS
            ))?;
            rows.into_iter().map(post_from_row).collect()
        })
        .await
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| select_post(conn, &id)).await
    }

    async fn create_post(&self, draft: PostDraft) -> Result<Post, StoreError> {
        self.run(move |conn| {
            let now = Utc::now();
            let post = Post {
                id: generate_truncated_uuid(),
                title: draft.title,
                content: draft.content,
                created_at: now,
                updated_at: now,
            };
            conn.exec_drop(
                "INSERT INTO posts (id, title, content, created_at, updated_at) VALUES (:id, :title, :content, :created_at, :updated_at)",
                params! {
                    "id" => &post.id,
                    "title" => &post.title,
                    "content" => &post.content,
                    "created_at" => millis(&post.created_at),
                    "updated_at" => millis(&post.updated_at),
                },
            )?;
            Ok(post)
        })
        .await
    }

    async fn update_post(&self, id: &str, draft: PostDraft) -> Result<Option<Post>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.exec_drop(
                "UPDATE posts SET title = :title, content = :content, updated_at = :updated_at WHERE id = :id",
                params! {
                    "id" => &id,
                    "title" => draft.title,
                    "content" => draft.content,
                    "updated_at" => millis(&Utc::now()),
                },
            )?;
            select_post(conn, &id)
        })
        .await
    }

    async fn delete_post(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.exec_drop("DELETE FROM posts WHERE id = :id", params! { "id" => id })?;
            Ok(conn.affected_rows() > 0)
        })
        .await
    }

    async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, StoreError> {
        let post_id = post_id.to_string();
        self.run(move |conn| {
            let rows: Vec<Row> = conn.exec(
                format!(
                    "SELECT {} FROM comments WHERE post_id = :post_id ORDER BY created_at ASC",
                    COMMENT_COLUMNS
                ),
                params! { "post_id" => post_id },
            )?;
            rows.into_iter().map(comment_from_row).collect()
        })
        .await
    }

    async fn create_comment(&self, post_id: &str, draft: CommentDraft) -> Result<Comment, StoreError> {
        let post_id = post_id.to_string();
        self.run(move |conn| {
            let comment = Comment {
                id: generate_truncated_uuid(),
                post_id,
                author: draft.author,
                content: draft.content,
                created_at: Utc::now(),
            };
            conn.exec_drop(
                "INSERT INTO comments (id, post_id, author, content, created_at) VALUES (:id, :post_id, :author, :content, :created_at)",
                params! {
                    "id" => &comment.id,
                    "post_id" => &comment.post_id,
                    "author" => &comment.author,
                    "content" => &comment.content,
                    "created_at" => millis(&comment.created_at),
                },
            )?;
            Ok(comment)
        })
        .await
    }

    async fn delete_comment(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.exec_drop("DELETE FROM comments WHERE id = :id", params! { "id" => id })?;
            Ok(conn.affected_rows() > 0)
        })
        .await
    }

    async fn list_works(&self, include_drafts: bool) -> Result<Vec<Work>, StoreError> {
        self.run(move |conn| {
            let filter = if include_drafts { "" } else { "WHERE published = 1" };
            let rows: Vec<Row> = conn.query(format!(
                "SELECT {} FROM works {} ORDER BY created_at DESC",
                WORK_COLUMNS, filter
            ))?;
            rows.into_iter().map(work_from_row).collect()
        })
        .await
    }

    async fn get_work(&self, id: &str) -> Result<Option<Work>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| select_work(conn, &id)).await
    }

    async fn create_work(&self, draft: WorkDraft) -> Result<Work, StoreError> {
        self.run(move |conn| {
            let now = Utc::now();
            let work = Work {
                id: generate_truncated_uuid(),
                title: draft.title,
                content: draft.content,
                category: draft.category,
                tech_stack: draft.tech_stack,
                links: draft.links,
                status: draft.status,
                duration: draft.duration,
                thumbnail: draft.thumbnail,
                published: draft.published,
                created_at: now,
                updated_at: now,
            };
            conn.exec_drop(
                "INSERT INTO works (id, title, content, category, tech_stack, links, status, duration, thumbnail, published, created_at, updated_at)
                VALUES (:id, :title, :content, :category, :tech_stack, :links, :status, :duration, :thumbnail, :published, :created_at, :updated_at)",
                params! {
                    "id" => &work.id,
                    "title" => &work.title,
                    "content" => &work.content,
                    "category" => work.category.as_ref(),
                    "tech_stack" => serde_json::to_string(&work.tech_stack)?,
                    "links" => serde_json::to_string(&work.links)?,
                    "status" => work.status.as_ref(),
                    "duration" => &work.duration,
                    "thumbnail" => &work.thumbnail,
                    "published" => work.published,
                    "created_at" => millis(&work.created_at),
                    "updated_at" => millis(&work.updated_at),
                },
            )?;
            Ok(work)
        })
        .await
    }

    async fn update_work(&self, id: &str, draft: WorkDraft) -> Result<Option<Work>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.exec_drop(
                "UPDATE works SET title = :title, content = :content, category = :category, tech_stack = :tech_stack,
                    links = :links, status = :status, duration = :duration, thumbnail = :thumbnail,
                    published = :published, updated_at = :updated_at
                WHERE id = :id",
                params! {
                    "id" => &id,
                    "title" => draft.title,
                    "content" => draft.content,
                    "category" => draft.category.as_ref(),
                    "tech_stack" => serde_json::to_string(&draft.tech_stack)?,
                    "links" => serde_json::to_string(&draft.links)?,
                    "status" => draft.status.as_ref(),
                    "duration" => draft.duration,
                    "thumbnail" => draft.thumbnail,
                    "published" => draft.published,
                    "updated_at" => millis(&Utc::now()),
                },
            )?;
            select_work(conn, &id)
        })
        .await
    }

    async fn delete_work(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.exec_drop("DELETE FROM works WHERE id = :id", params! { "id" => id })?;
            Ok(conn.affected_rows() > 0)
        })
        .await
    }

    async fn list_archives(&self, include_drafts: bool) -> Result<Vec<Archive>, StoreError> {
        self.run(move |conn| {
            let filter = if include_drafts { "" } else { "WHERE published = 1" };
            let rows: Vec<Row> = conn.query(format!(
                "SELECT {} FROM archives {} ORDER BY created_at DESC",
                ARCHIVE_COLUMNS, filter
            ))?;
            rows.into_iter().map(archive_from_row).collect()
        })
        .await
    }

    async fn get_archive(&self, id: &str) -> Result<Option<Archive>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| select_archive(conn, &id)).await
    }

    async fn create_archive(&self, draft: ArchiveDraft) -> Result<Archive, StoreError> {
        self.run(move |conn| {
            let now = Utc::now();
            let archive = Archive {
                id: generate_truncated_uuid(),
                title: draft.title,
                content: draft.content,
                category: draft.category,
                tags: draft.tags,
                rating: draft.rating,
                published: draft.published,
                created_at: now,
                updated_at: now,
            };
            conn.exec_drop(
                "INSERT INTO archives (id, title, content, category, tags, rating, published, created_at, updated_at)
                VALUES (:id, :title, :content, :category, :tags, :rating, :published, :created_at, :updated_at)",
                params! {
                    "id" => &archive.id,
                    "title" => &archive.title,
                    "content" => &archive.content,
                    "category" => archive.category.as_ref(),
                    "tags" => serde_json::to_string(&archive.tags)?,
                    "rating" => archive.rating,
                    "published" => archive.published,
                    "created_at" => millis(&archive.created_at),
                    "updated_at" => millis(&archive.updated_at),
                },
            )?;
            Ok(archive)
        })
        .await
    }

    async fn update_archive(&self, id: &str, draft: ArchiveDraft) -> Result<Option<Archive>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.exec_drop(
                "UPDATE archives SET title = :title, content = :content, category = :category, tags = :tags,
                    rating = :rating, published = :published, updated_at = :updated_at
                WHERE id = :id",
                params! {
                    "id" => &id,
                    "title" => draft.title,
                    "content" => draft.content,
                    "category" => draft.category.as_ref(),
                    "tags" => serde_json::to_string(&draft.tags)?,
                    "rating" => draft.rating,
                    "published" => draft.published,
                    "updated_at" => millis(&Utc::now()),
                },
            )?;
            select_archive(conn, &id)
        })
        .await
    }

    async fn delete_archive(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.exec_drop("DELETE FROM archives WHERE id = :id", params! { "id" => id })?;
            Ok(conn.affected_rows() > 0)
        })
        .await
    }

    async fn list_pages(&self) -> Result<Vec<PageContent>, StoreError> {
        self.run(|conn| {
            let rows: Vec<Row> = conn.query(format!(
                "SELECT {} FROM page_contents ORDER BY page",
                PAGE_COLUMNS
            ))?;
            rows.into_iter().map(page_from_row).collect()
        })
        .await
    }

    async fn get_page(&self, page: PageName) -> Result<Option<PageContent>, StoreError> {
        self.run(move |conn| select_page(conn, page)).await
    }

    async fn upsert_page(&self, page: PageName, draft: PageDraft) -> Result<PageContent, StoreError> {
        self.run(move |conn| {
            let content = PageContent {
                page,
                title: draft.title,
                content: draft.content,
                sections: draft.sections,
                updated_at: Utc::now(),
            };
            conn.exec_drop(
                "INSERT INTO page_contents (page, title, content, sections, updated_at)
                VALUES (:page, :title, :content, :sections, :updated_at)
                ON DUPLICATE KEY UPDATE title = VALUES(title), content = VALUES(content),
                    sections = VALUES(sections), updated_at = VALUES(updated_at)",
                params! {
                    "page" => page.as_ref(),
                    "title" => &content.title,
                    "content" => &content.content,
                    "sections" => serde_json::to_string(&content.sections)?,
                    "updated_at" => millis(&content.updated_at),
                },
            )?;
            Ok(content)
        })
        .await
    }
}

fn select_post(conn: &mut PooledConn, id: &str) -> Result<Option<Post>, StoreError> {
    let row: Option<Row> = conn.exec_first(
        format!("SELECT {} FROM posts WHERE id = :id", POST_COLUMNS),
        params! { "id" => id },
    )?;
    row.map(post_from_row).transpose()
}

fn select_work(conn: &mut PooledConn, id: &str) -> Result<Option<Work>, StoreError> {
    let row: Option<Row> = conn.exec_first(
        format!("SELECT {} FROM works WHERE id = :id", WORK_COLUMNS),
        params! { "id" => id },
    )?;
    row.map(work_from_row).transpose()
}

fn select_archive(conn: &mut PooledConn, id: &str) -> Result<Option<Archive>, StoreError> {
    let row: Option<Row> = conn.exec_first(
        format!("SELECT {} FROM archives WHERE id = :id", ARCHIVE_COLUMNS),
        params! { "id" => id },
    )?;
    row.map(archive_from_row).transpose()
}

fn select_page(conn: &mut PooledConn, page: PageName) -> Result<Option<PageContent>, StoreError> {
    let row: Option<Row> = conn.exec_first(
        format!("SELECT {} FROM page_contents WHERE page = :page", PAGE_COLUMNS),
        params! { "page" => page.as_ref() },
    )?;
    row.map(page_from_row).transpose()
}

fn post_from_row(mut row: Row) -> Result<Post, StoreError> {
    Ok(Post {
        id: take(&mut row, "id")?,
        title: take(&mut row, "title")?,
        content: take(&mut row, "content")?,
        created_at: take_time(&mut row, "created_at")?,
        updated_at: take_time(&mut row, "updated_at")?,
    })
}

fn comment_from_row(mut row: Row) -> Result<Comment, StoreError> {
    Ok(Comment {
        id: take(&mut row, "id")?,
        post_id: take(&mut row, "post_id")?,
        author: take(&mut row, "author")?,
        content: take(&mut row, "content")?,
        created_at: take_time(&mut row, "created_at")?,
    })
}

fn work_from_row(mut row: Row) -> Result<Work, StoreError> {
    Ok(Work {
        id: take(&mut row, "id")?,
        title: take(&mut row, "title")?,
        content: take(&mut row, "content")?,
        category: take_enum(&mut row, "category")?,
        tech_stack: take_json(&mut row, "tech_stack")?,
        links: take_json(&mut row, "links")?,
        status: take_enum(&mut row, "status")?,
        duration: take(&mut row, "duration")?,
        thumbnail: take(&mut row, "thumbnail")?,
        published: take(&mut row, "published")?,
        created_at: take_time(&mut row, "created_at")?,
        updated_at: take_time(&mut row, "updated_at")?,
    })
}

fn archive_from_row(mut row: Row) -> Result<Archive, StoreError> {
    Ok(Archive {
        id: take(&mut row, "id")?,
        title: take(&mut row, "title")?,
        content: take(&mut row, "content")?,
        category: take_enum(&mut row, "category")?,
        tags: take_json(&mut row, "tags")?,
        rating: take(&mut row, "rating")?,
        published: take(&mut row, "published")?,
        created_at: take_time(&mut row, "created_at")?,
        updated_at: take_time(&mut row, "updated_at")?,
    })
}

fn page_from_row(mut row: Row) -> Result<PageContent, StoreError> {
    Ok(PageContent {
        page: take_enum(&mut row, "page")?,
        title: take(&mut row, "title")?,
        content: take(&mut row, "content")?,
        sections: take_json(&mut row, "sections")?,
        updated_at: take_time(&mut row, "updated_at")?,
    })
}

fn take<T: FromValue>(row: &mut Row, column: &str) -> Result<T, StoreError> {
    row.take_opt(column)
        .ok_or_else(|| StoreError::Decode(format!("missing column {}", column)))?
        .map_err(|e| StoreError::Decode(format!("{}: {:?}", column, e)))
}

fn take_time(row: &mut Row, column: &str) -> Result<DateTime<Utc>, StoreError> {
    let ms: i64 = take(row, column)?;
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Decode(format!("{}: timestamp {} out of range", column, ms)))
}

fn take_enum<T: FromStr>(row: &mut Row, column: &str) -> Result<T, StoreError> {
    let raw: String = take(row, column)?;
    T::from_str(&raw).map_err(|_| StoreError::Decode(format!("{}: unknown value '{}'", column, raw)))
}

fn take_json<T: serde::de::DeserializeOwned>(row: &mut Row, column: &str) -> Result<T, StoreError> {
    let raw: String = take(row, column)?;
    Ok(serde_json::from_str(&raw)?)
}

fn millis(at: &DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}
