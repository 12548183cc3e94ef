use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: WorkCategory,
    pub tech_stack: Vec<String>,
    pub links: Vec<WorkLink>,
    pub status: WorkStatus,
    pub duration: Option<String>,
    pub thumbnail: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archive {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: ArchiveCategory,
    pub tags: Vec<String>,
    pub rating: Option<u8>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub page: PageName,
    pub title: String,
    pub content: String,
    pub sections: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WorkCategory {
    Web,
    Mobile,
    Desktop,
    Library,
    Design,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WorkStatus {
    Planned,
    InProgress,
    Completed,
    Archived,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ArchiveCategory {
    Book,
    Movie,
    Music,
    Game,
    Article,
    Other,
}

/// Pages whose copy is editable from the admin screens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PageName {
    Home,
    About,
    Work,
    Archive,
}

impl PageName {
    /// Public path of the page on the site.
    pub fn path(&self) -> &'static str {
        match self {
            PageName::Home => "/",
            PageName::About => "/about",
            PageName::Work => "/work",
            PageName::Archive => "/archive",
        }
    }
}

/// Validated post fields, ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentDraft {
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkDraft {
    pub title: String,
    pub content: String,
    pub category: WorkCategory,
    pub tech_stack: Vec<String>,
    pub links: Vec<WorkLink>,
    pub status: WorkStatus,
    pub duration: Option<String>,
    pub thumbnail: Option<String>,
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveDraft {
    pub title: String,
    pub content: String,
    pub category: ArchiveCategory,
    pub tags: Vec<String>,
    pub rating: Option<u8>,
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    pub title: String,
    pub content: String,
    pub sections: serde_json::Value,
}
