use scraper::{Html, Selector};
use uuid::Uuid;

pub mod app;
pub mod archives;
pub mod assistant;
pub mod auth;
pub mod comments;
pub mod config;
pub mod content;
pub mod database;
pub mod error;
pub mod feeds;
pub mod health;
pub mod image;
pub mod models;
pub mod pages;
pub mod posts;
pub mod seo;
pub mod session;
pub mod store;
pub mod validation;
pub mod works;

pub use app::{router, AppState};
pub use config::Config;
pub use error::ApiError;
pub use store::{BlogStore, StoreError};

/// Flattens an HTML fragment to its visible text, one block per line.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let block_selector = Selector::parse("p, h1, h2, h3, h4, h5, h6, li, blockquote, pre")
        .expect("static selector");

    let mut blocks = vec![];
    for block in fragment.select(&block_selector) {
        // nested blocks (li > p) are picked up by their own match
        if block
            .ancestors()
            .filter_map(scraper::ElementRef::wrap)
            .any(|a| block_selector.matches(&a))
        {
            continue;
        }
        let text = collapse_whitespace(&block.text().collect::<String>());
        if !text.is_empty() {
            blocks.push(text);
        }
    }

    if blocks.is_empty() {
        return collapse_whitespace(&fragment.root_element().text().collect::<String>());
    }
    blocks.join("\n")
}

/// Plain-text excerpt of at most `max_chars` characters, cut on a word
/// boundary when possible.
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = collapse_whitespace(&html_to_text(html));
    if text.chars().count() <= max_chars {
        return text;
    }

    let cut: Vec<char> = text.chars().take(max_chars).collect();
    let kept = match cut.iter().rposition(|c| *c == ' ') {
        Some(pos) if pos > max_chars / 2 => &cut[..pos],
        _ => &cut[..],
    };
    let trimmed: String = kept.iter().collect();
    format!("{}…", trimmed.trim_end())
}

/// `src` of the first `<img>` in the fragment.
pub fn first_image_src(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let img = Selector::parse("img[src]").expect("static selector");
    fragment
        .select(&img)
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

pub fn generate_truncated_uuid() -> String {
    let uuid = Uuid::new_v4();
    let hex = uuid.as_simple().to_string();
    hex[..24].to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
