use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Archive, ArchiveDraft, Comment, CommentDraft, PageContent, PageDraft, PageName, Post,
    PostDraft, Work, WorkDraft,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mysql error: {0}")]
    Mysql(#[from] mysql::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("json column error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("row decode error: {0}")]
    Decode(String),
}

/// MySQL `ER_NO_REFERENCED_ROW_2`, raised when a child row points at a
/// parent that no longer exists.
const ER_NO_REFERENCED_ROW: u16 = 1452;

impl StoreError {
    /// True when an insert failed because its parent row is gone.
    pub fn is_missing_parent(&self) -> bool {
        matches!(
            self,
            StoreError::Mysql(mysql::Error::MySqlError(e)) if e.code == ER_NO_REFERENCED_ROW
        )
    }
}

/// Persistence for every entity the site serves.
///
/// Updates and deletes report a missing record through `None` / `false`
/// rather than an error.
#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;
    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError>;
    async fn create_post(&self, draft: PostDraft) -> Result<Post, StoreError>;
    async fn update_post(&self, id: &str, draft: PostDraft) -> Result<Option<Post>, StoreError>;
    async fn delete_post(&self, id: &str) -> Result<bool, StoreError>;

    async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, StoreError>;
    async fn create_comment(&self, post_id: &str, draft: CommentDraft) -> Result<Comment, StoreError>;
    async fn delete_comment(&self, id: &str) -> Result<bool, StoreError>;

    /// Newest first; unpublished works only when `include_drafts` is set.
    async fn list_works(&self, include_drafts: bool) -> Result<Vec<Work>, StoreError>;
    async fn get_work(&self, id: &str) -> Result<Option<Work>, StoreError>;
    async fn create_work(&self, draft: WorkDraft) -> Result<Work, StoreError>;
    async fn update_work(&self, id: &str, draft: WorkDraft) -> Result<Option<Work>, StoreError>;
    async fn delete_work(&self, id: &str) -> Result<bool, StoreError>;

    async fn list_archives(&self, include_drafts: bool) -> Result<Vec<Archive>, StoreError>;
    async fn get_archive(&self, id: &str) -> Result<Option<Archive>, StoreError>;
    async fn create_archive(&self, draft: ArchiveDraft) -> Result<Archive, StoreError>;
    async fn update_archive(&self, id: &str, draft: ArchiveDraft) -> Result<Option<Archive>, StoreError>;
    async fn delete_archive(&self, id: &str) -> Result<bool, StoreError>;

    async fn list_pages(&self) -> Result<Vec<PageContent>, StoreError>;
    async fn get_page(&self, page: PageName) -> Result<Option<PageContent>, StoreError>;
    async fn upsert_page(&self, page: PageName, draft: PageDraft) -> Result<PageContent, StoreError>;
}
