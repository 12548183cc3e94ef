//! Form payloads and the rules turning them into store drafts.
//!
//! Every payload validates all of its fields before failing so the admin
//! forms can highlight each offending input at once.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{bilingual, collapse};
use crate::models::{
    ArchiveCategory, ArchiveDraft, CommentDraft, PageDraft, PostDraft, WorkCategory, WorkDraft,
    WorkLink, WorkStatus,
};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 50_000;
pub const MAX_PAGE_CONTENT_CHARS: usize = 100_000;
pub const MAX_AUTHOR_CHARS: usize = 50;
pub const MAX_COMMENT_CHARS: usize = 1_000;
pub const MAX_LIST_ITEMS: usize = 30;
pub const MAX_LIST_ITEM_CHARS: usize = 50;
pub const MAX_LINKS: usize = 10;
pub const MAX_DURATION_CHARS: usize = 100;

/// Field name → messages, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().copied().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A list field sent either as `"a, b"` or as `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    Csv(String),
    Items(Vec<String>),
}

impl Default for ListInput {
    fn default() -> Self {
        ListInput::Items(vec![])
    }
}

impl ListInput {
    /// Trimmed, non-empty entries with case-insensitive duplicates dropped.
    pub fn normalize(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ListInput::Csv(csv) => csv.split(',').collect(),
            ListInput::Items(items) => items.iter().flat_map(|i| i.split(',')).collect(),
        };

        let mut out: Vec<String> = vec![];
        for item in raw.into_iter().map(str::trim).filter(|i| !i.is_empty()) {
            if !out.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
                out.push(item.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub content_en: Option<String>,
}

impl PostPayload {
    pub fn validate(self) -> Result<PostDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let title = check_title(&mut errors, &self.title);
        let content = check_content(&mut errors, &self.content, self.content_en.as_deref(), MAX_CONTENT_CHARS, true);
        errors.into_result(|| PostDraft { title, content })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
}

impl CommentPayload {
    pub fn validate(self) -> Result<CommentDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let author = self.author.trim().to_string();
        let content = self.content.trim().to_string();

        check_length(&mut errors, "author", &author, MAX_AUTHOR_CHARS, true);
        check_length(&mut errors, "content", &content, MAX_COMMENT_CHARS, true);

        errors.into_result(|| CommentDraft { author, content })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLinkPayload {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub content_en: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tech_stack: ListInput,
    #[serde(default)]
    pub links: Vec<WorkLinkPayload>,
    pub status: Option<String>,
    pub duration: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl WorkPayload {
    pub fn validate(self) -> Result<WorkDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = check_title(&mut errors, &self.title);
        let content = check_content(&mut errors, &self.content, self.content_en.as_deref(), MAX_CONTENT_CHARS, false);
        let category = check_enum::<WorkCategory>(&mut errors, "category", Some(self.category.as_str()));
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => Some(WorkStatus::Completed),
            Some(raw) => check_enum::<WorkStatus>(&mut errors, "status", Some(raw)),
        };
        let tech_stack = check_list(&mut errors, "techStack", &self.tech_stack);

        if self.links.len() > MAX_LINKS {
            errors.add("links", format!("at most {} links are allowed", MAX_LINKS));
        }
        let mut links = vec![];
        for link in &self.links {
            let label = link.label.trim();
            let url = link.url.trim();
            if label.is_empty() || label.chars().count() > MAX_LIST_ITEM_CHARS {
                errors.add("links", format!("link label must be 1-{} characters", MAX_LIST_ITEM_CHARS));
            }
            if !is_link(url) {
                errors.add("links", format!("'{}' is not a valid http(s) URL", url));
            }
            links.push(WorkLink {
                label: label.to_string(),
                url: url.to_string(),
            });
        }

        let duration = optional_text(self.duration);
        if let Some(d) = &duration {
            check_length(&mut errors, "duration", d, MAX_DURATION_CHARS, false);
        }
        let thumbnail = optional_text(self.thumbnail);
        if let Some(t) = &thumbnail {
            if !is_link(t) && !t.starts_with('/') {
                errors.add("thumbnail", "thumbnail must be a URL or an absolute path");
            }
        }

        errors.into_result(|| WorkDraft {
            title,
            content,
            category: category.unwrap_or(WorkCategory::Other),
            tech_stack,
            links,
            status: status.unwrap_or(WorkStatus::Completed),
            duration,
            thumbnail,
            published: self.published,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub content_en: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: ListInput,
    pub rating: Option<i64>,
    #[serde(default)]
    pub published: bool,
}

impl ArchivePayload {
    pub fn validate(self) -> Result<ArchiveDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = check_title(&mut errors, &self.title);
        let content = check_content(&mut errors, &self.content, self.content_en.as_deref(), MAX_CONTENT_CHARS, false);
        let category = check_enum::<ArchiveCategory>(&mut errors, "category", Some(self.category.as_str()));
        let tags = check_list(&mut errors, "tags", &self.tags);

        let rating = match self.rating {
            None => None,
            Some(r @ 1..=5) => Some(r as u8),
            Some(_) => {
                errors.add("rating", "rating must be between 1 and 5");
                None
            }
        };

        errors.into_result(|| ArchiveDraft {
            title,
            content,
            category: category.unwrap_or(ArchiveCategory::Other),
            tags,
            rating,
            published: self.published,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub content_en: Option<String>,
    pub sections: Option<Value>,
}

impl PagePayload {
    pub fn validate(self) -> Result<PageDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = check_title(&mut errors, &self.title);
        let content = check_content(&mut errors, &self.content, self.content_en.as_deref(), MAX_PAGE_CONTENT_CHARS, false);
        let sections = match self.sections {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(v @ (Value::Object(_) | Value::Array(_))) => v,
            Some(_) => {
                errors.add("sections", "sections must be an object or an array");
                Value::Null
            }
        };

        errors.into_result(|| PageDraft {
            title,
            content,
            sections,
        })
    }
}

fn check_title(errors: &mut ValidationErrors, raw: &str) -> String {
    let title = raw.trim().to_string();
    check_length(errors, "title", &title, MAX_TITLE_CHARS, true);
    title
}

/// Re-applies the heading collapse pass to each language on its own, then
/// joins the optional English side into the stored blob.
fn check_content(
    errors: &mut ValidationErrors,
    ko: &str,
    en: Option<&str>,
    max: usize,
    required: bool,
) -> String {
    let content = match en.map(str::trim) {
        Some(en) => bilingual::build(&collapse::normalize(ko.trim()), &collapse::normalize(en)),
        None => collapse::normalize(ko),
    };
    check_length(errors, "content", content.trim(), max, required);
    content
}

fn check_length(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize, required: bool) {
    let len = value.chars().count();
    if required && len == 0 {
        errors.add(field, format!("{} is required", field));
    } else if len > max {
        errors.add(field, format!("{} must be at most {} characters", field, max));
    }
}

fn check_enum<T>(errors: &mut ValidationErrors, field: &'static str, raw: Option<&str>) -> Option<T>
where
    T: FromStr,
{
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        errors.add(field, format!("{} is required", field));
        return None;
    }
    match T::from_str(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, format!("unknown {} '{}'", field, raw));
            None
        }
    }
}

fn check_list(errors: &mut ValidationErrors, field: &'static str, input: &ListInput) -> Vec<String> {
    let items = input.normalize();
    if items.len() > MAX_LIST_ITEMS {
        errors.add(field, format!("at most {} entries are allowed", MAX_LIST_ITEMS));
    }
    if let Some(long) = items.iter().find(|i| i.chars().count() > MAX_LIST_ITEM_CHARS) {
        errors.add(
            field,
            format!("'{}' is longer than {} characters", long, MAX_LIST_ITEM_CHARS),
        );
    }
    items
}

fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn is_link(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}
