//! HTML content helpers shared by the write and read paths.

pub mod bilingual;
pub mod cloudinary;
pub mod collapse;

pub use bilingual::{BilingualContent, Lang, LangQuery};
pub use collapse::CollapsibleDocument;

/// Escapes the five XML special characters for text and attribute values.
pub fn escape_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
