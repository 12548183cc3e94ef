#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceExt;

use folio::assistant::{AssistantError, ContentAssistant, Summary, Translation};
use folio::auth::hash_password;
use folio::content::Lang;
use folio::generate_truncated_uuid;
use folio::image::{CheckedUpload, MediaError, MediaStore, StoredMedia};
use folio::models::{
    Archive, ArchiveDraft, Comment, CommentDraft, PageContent, PageDraft, PageName, Post,
    PostDraft, Work, WorkDraft,
};
use folio::{router, AppState, BlogStore, Config, StoreError};

pub const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub const JWT_SECRET: &str = "0123456789abcdef0123456789abcdef";

/// In-memory store; records are kept in insertion order and listed newest
/// first, like the SQL queries.
#[derive(Default)]
pub struct MemoryStore {
    posts: RwLock<Vec<Post>>,
    comments: RwLock<Vec<Comment>>,
    works: RwLock<Vec<Work>>,
    archives: RwLock<Vec<Archive>>,
    pages: RwLock<Vec<PageContent>>,
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        Ok(self.posts.read().await.iter().rev().cloned().collect())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, draft: PostDraft) -> Result<Post, StoreError> {
        let now = Utc::now();
        let post = Post {
            id: generate_truncated_uuid(),
            title: draft.title,
            content: draft.content,
            created_at: now,
            updated_at: now,
        };
        self.posts.write().await.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: &str, draft: PostDraft) -> Result<Option<Post>, StoreError> {
        let mut posts = self.posts.write().await;
        Ok(posts.iter_mut().find(|p| p.id == id).map(|p| {
            p.title = draft.title;
            p.content = draft.content;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_post(&self, id: &str) -> Result<bool, StoreError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        let removed = posts.len() != before;
        if removed {
            self.comments.write().await.retain(|c| c.post_id != id);
        }
        Ok(removed)
    }

    async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, StoreError> {
        Ok(self
            .comments
            .read()
            .await
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_comment(&self, post_id: &str, draft: CommentDraft) -> Result<Comment, StoreError> {
        let comment = Comment {
            id: generate_truncated_uuid(),
            post_id: post_id.to_string(),
            author: draft.author,
            content: draft.content,
            created_at: Utc::now(),
        };
        self.comments.write().await.push(comment.clone());
        Ok(comment)
    }

    async fn delete_comment(&self, id: &str) -> Result<bool, StoreError> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| c.id != id);
        Ok(comments.len() != before)
    }

    async fn list_works(&self, include_drafts: bool) -> Result<Vec<Work>, StoreError> {
        Ok(self
            .works
            .read()
            .await
            .iter()
            .rev()
            .filter(|w| include_drafts || w.published)
            .cloned()
            .collect())
    }

    async fn get_work(&self, id: &str) -> Result<Option<Work>, StoreError> {
        Ok(self.works.read().await.iter().find(|w| w.id == id).cloned())
    }

    async fn create_work(&self, draft: WorkDraft) -> Result<Work, StoreError> {
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
        self.works.write().await.push(work.clone());
        Ok(work)
    }

    async fn update_work(&self, id: &str, draft: WorkDraft) -> Result<Option<Work>, StoreError> {
        let mut works = self.works.write().await;
        Ok(works.iter_mut().find(|w| w.id == id).map(|w| {
            w.title = draft.title;
            w.content = draft.content;
            w.category = draft.category;
            w.tech_stack = draft.tech_stack;
            w.links = draft.links;
            w.status = draft.status;
            w.duration = draft.duration;
            w.thumbnail = draft.thumbnail;
            w.published = draft.published;
            w.updated_at = Utc::now();
            w.clone()
        }))
    }

    async fn delete_work(&self, id: &str) -> Result<bool, StoreError> {
        let mut works = self.works.write().await;
        let before = works.len();
        works.retain(|w| w.id != id);
        Ok(works.len() != before)
    }

    async fn list_archives(&self, include_drafts: bool) -> Result<Vec<Archive>, StoreError> {
        Ok(self
            .archives
            .read()
            .await
            .iter()
            .rev()
            .filter(|a| include_drafts || a.published)
            .cloned()
            .collect())
    }

    async fn get_archive(&self, id: &str) -> Result<Option<Archive>, StoreError> {
        Ok(self.archives.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn create_archive(&self, draft: ArchiveDraft) -> Result<Archive, StoreError> {
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
        self.archives.write().await.push(archive.clone());
        Ok(archive)
    }

    async fn update_archive(&self, id: &str, draft: ArchiveDraft) -> Result<Option<Archive>, StoreError> {
        let mut archives = self.archives.write().await;
        Ok(archives.iter_mut().find(|a| a.id == id).map(|a| {
            a.title = draft.title;
            a.content = draft.content;
            a.category = draft.category;
            a.tags = draft.tags;
            a.rating = draft.rating;
            a.published = draft.published;
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn delete_archive(&self, id: &str) -> Result<bool, StoreError> {
        let mut archives = self.archives.write().await;
        let before = archives.len();
        archives.retain(|a| a.id != id);
        Ok(archives.len() != before)
    }

    async fn list_pages(&self) -> Result<Vec<PageContent>, StoreError> {
        Ok(self.pages.read().await.clone())
    }

    async fn get_page(&self, page: PageName) -> Result<Option<PageContent>, StoreError> {
        Ok(self.pages.read().await.iter().find(|p| p.page == page).cloned())
    }

    async fn upsert_page(&self, page: PageName, draft: PageDraft) -> Result<PageContent, StoreError> {
        let content = PageContent {
            page,
            title: draft.title,
            content: draft.content,
            sections: draft.sections,
            updated_at: Utc::now(),
        };
        let mut pages = self.pages.write().await;
        pages.retain(|p| p.page != page);
        pages.push(content.clone());
        Ok(content)
    }
}

/// Keeps the uploads it was asked to store.
#[derive(Default)]
pub struct RecordingMedia {
    pub stored: Mutex<Vec<CheckedUpload>>,
}

#[async_trait]
impl MediaStore for RecordingMedia {
    fn provider(&self) -> &'static str {
        "memory"
    }

    async fn store(&self, upload: CheckedUpload) -> Result<StoredMedia, MediaError> {
        let stored = StoredMedia {
            url: format!("/uploads/{}", upload.file_name.clone().unwrap_or_default()),
            provider: self.provider(),
            mime: upload.mime.to_string(),
            size: upload.bytes.len(),
        };
        self.stored.lock().await.push(upload);
        Ok(stored)
    }
}

/// Answers with canned text derived from its input.
pub struct EchoAssistant;

#[async_trait]
impl ContentAssistant for EchoAssistant {
    async fn summarize(&self, text: &str, lang: Lang) -> Result<Summary, AssistantError> {
        Ok(Summary {
            summary: format!("[{}] {}", lang, text),
            keywords: vec!["echo".to_string()],
        })
    }

    async fn translate(&self, html: &str, to: Lang) -> Result<Translation, AssistantError> {
        Ok(Translation {
            translation: format!("[{}] {}", to, html),
        })
    }
}

pub fn test_config() -> Config {
    let hash = hash_password(ADMIN_PASSWORD, "testsalt");
    Config::from_lookup(move |key| match key {
        "DB_URL" => Some("mysql://unused@localhost/folio".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "ADMIN_PASSWORD_HASH" => Some(hash.clone()),
        "SITE_URL" => Some("https://folio.example".to_string()),
        "SITE_TITLE" => Some("folio".to_string()),
        "UPLOAD_BASE_URL" => Some("https://cdn.folio.example/uploads".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub media: Arc<RecordingMedia>,
}

impl TestApp {
    pub fn new(with_assistant: bool) -> Self {
        let store = Arc::new(MemoryStore::default());
        let media = Arc::new(RecordingMedia::default());
        let assistant: Option<Arc<dyn ContentAssistant>> = if with_assistant {
            Some(Arc::new(EchoAssistant))
        } else {
            None
        };

        let state = AppState {
            config: Arc::new(test_config()),
            store: store.clone(),
            media: media.clone(),
            assistant,
        };
        Self {
            router: router(state),
            store,
            media,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("infallible router")
    }

    /// Logs in and returns the `Cookie` header value for admin requests.
    pub async fn admin_cookie(&self) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/api/auth/login",
                None,
                &serde_json::json!({ "password": ADMIN_PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login sets a cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
