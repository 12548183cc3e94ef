//! Korean/English content stored side by side in a single HTML blob.
//!
//! Each language lives in its own `<section data-lang="..">` wrapper. A blob
//! without any wrapper is plain Korean content.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Lang {
    #[default]
    Ko,
    En,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BilingualContent {
    pub ko: String,
    pub en: String,
    pub is_bilingual: bool,
}

impl BilingualContent {
    /// Content for `lang`, falling back to Korean when the English side is empty.
    pub fn pick(&self, lang: Lang) -> &str {
        match lang {
            Lang::En if !self.en.is_empty() => &self.en,
            _ => &self.ko,
        }
    }
}

/// `?lang=ko|en` on read endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LangQuery {
    pub lang: Option<Lang>,
}

impl LangQuery {
    /// Narrows a stored blob to the requested language. Without `lang` the
    /// blob is returned untouched.
    pub fn localize(&self, content: String) -> String {
        match self.lang {
            Some(lang) => split(&content).pick(lang).to_string(),
            None => content,
        }
    }
}

fn section_open() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<section\s+data-lang=["'](ko|en)["']\s*>"#).expect("valid section pattern")
    })
}

fn section_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)<(/?)section\b[^>]*>").expect("valid section tag pattern"))
}

/// End of the body opened at `start` and the offset just past its matching
/// `</section>`. Nested sections stay inside the body. An unclosed wrapper
/// runs to the end of the blob.
fn section_end(html: &str, start: usize) -> (usize, usize) {
    let mut depth = 1usize;
    for tag in section_tag().captures_iter(&html[start..]) {
        let whole = tag.get(0).map_or(0..0, |m| m.range());
        if tag[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return (start + whole.start, start + whole.end);
            }
        }
    }
    (html.len(), html.len())
}

/// Splits a blob into its language sections. Duplicated sections overwrite
/// each other, the last one wins.
pub fn split(html: &str) -> BilingualContent {
    let mut content = BilingualContent::default();
    let mut cursor = 0;

    while let Some(caps) = section_open().captures_at(html, cursor) {
        let open = caps.get(0).map_or(cursor..html.len(), |m| m.range());
        let (end, next) = section_end(html, open.end);
        let body = html[open.end..end].to_string();
        match &caps[1] {
            "en" => content.en = body,
            _ => content.ko = body,
        }
        content.is_bilingual = true;
        cursor = next;
    }

    if !content.is_bilingual {
        content.ko = html.to_string();
    }
    content
}

/// Joins both sides into one blob. A single non-empty side is returned as is.
pub fn build(ko: &str, en: &str) -> String {
    match (ko.is_empty(), en.is_empty()) {
        (false, false) => format!(
            "<section data-lang=\"ko\">{}</section>\n<section data-lang=\"en\">{}</section>",
            ko, en
        ),
        (false, true) => ko.to_string(),
        (true, false) => en.to_string(),
        (true, true) => String::new(),
    }
}
