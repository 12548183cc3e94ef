//! Collapsible sections under headings.
//!
//! A heading (`h1`-`h3`, or any element carrying `data-level="1..3"`) with
//! `data-collapsed="true"` hides the sibling elements after it, up to the
//! next heading of the same or a shallower level. Hidden siblings get an
//! inline `display:none` and a `data-collapse-hidden` marker that remembers
//! their original inline style.

use scraper::{ElementRef, Html, Node};

pub const COLLAPSED_ATTR: &str = "data-collapsed";
pub const HIDDEN_ATTR: &str = "data-collapse-hidden";
pub const LEVEL_ATTR: &str = "data-level";

const HIDDEN_STYLE: &str = "display:none";
const MAX_LEVEL: u8 = 3;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Element(ElementBlock),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementBlock {
    name: String,
    attrs: Vec<(String, String)>,
    inner_html: String,
}

impl ElementBlock {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attr(&mut self, name: &str, value: String) {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }

    /// Level 1-3 when this element acts as a collapsible heading.
    pub fn heading_level(&self) -> Option<u8> {
        let level = match self.name.as_str() {
            "h1" => Some(1),
            "h2" => Some(2),
            "h3" => Some(3),
            _ => self.attr(LEVEL_ATTR).and_then(|v| v.trim().parse::<u8>().ok()),
        };
        level.filter(|l| (1..=MAX_LEVEL).contains(l))
    }

    pub fn is_collapsed(&self) -> bool {
        self.attr(COLLAPSED_ATTR) == Some("true")
    }

    pub fn is_hidden(&self) -> bool {
        self.attr(HIDDEN_ATTR).is_some()
    }

    fn hide(&mut self) {
        if self.is_hidden() {
            return;
        }
        let original = self.attr("style").unwrap_or_default().to_string();
        let style = match original.trim().trim_end_matches(';') {
            "" => HIDDEN_STYLE.to_string(),
            rest => format!("{};{}", rest, HIDDEN_STYLE),
        };
        self.set_attr("style", style);
        self.set_attr(HIDDEN_ATTR, original);
    }

    fn unhide(&mut self) {
        let Some(original) = self.attr(HIDDEN_ATTR).map(str::to_string) else {
            return;
        };
        if original.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", original);
        }
        self.remove_attr(HIDDEN_ATTR);
    }

    fn to_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&self.name.as_str()) {
            return;
        }
        out.push_str(&self.inner_html);
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// The top-level block siblings of an HTML fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapsibleDocument {
    blocks: Vec<Block>,
}

impl CollapsibleDocument {
    pub fn parse(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        let mut blocks = vec![];

        for child in fragment.root_element().children() {
            match child.value() {
                Node::Element(el) => {
                    let Some(element) = ElementRef::wrap(child) else {
                        continue;
                    };
                    blocks.push(Block::Element(ElementBlock {
                        name: el.name().to_string(),
                        attrs: el
                            .attrs()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                        inner_html: element.inner_html(),
                    }));
                }
                Node::Text(text) => blocks.push(Block::Text(String::from(&**text))),
                Node::Comment(comment) => blocks.push(Block::Comment(String::from(&**comment))),
                _ => {}
            }
        }

        Self { blocks }
    }

    /// Element at block index `idx`.
    pub fn element(&self, idx: usize) -> Option<&ElementBlock> {
        match self.blocks.get(idx) {
            Some(Block::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Block indices of every collapsible heading, in document order.
    pub fn headings(&self) -> Vec<usize> {
        (0..self.blocks.len())
            .filter(|&i| self.element(i).and_then(ElementBlock::heading_level).is_some())
            .collect()
    }

    /// Block indices currently carrying the hidden marker.
    pub fn hidden(&self) -> Vec<usize> {
        (0..self.blocks.len())
            .filter(|&i| self.element(i).is_some_and(ElementBlock::is_hidden))
            .collect()
    }

    /// Hides the siblings following the heading at `idx` until a heading of
    /// equal or shallower level. Returns how many elements were hidden.
    pub fn collapse_after(&mut self, idx: usize) -> usize {
        let Some(level) = self.element(idx).and_then(ElementBlock::heading_level) else {
            return 0;
        };

        let mut count = 0;
        for block in self.blocks.iter_mut().skip(idx + 1) {
            let Block::Element(el) = block else {
                continue;
            };
            if el.heading_level().is_some_and(|l| l <= level) {
                break;
            }
            el.hide();
            count += 1;
        }
        count
    }

    /// Clears every hidden marker, then re-derives hidden state from the
    /// headings' `data-collapsed` flags.
    pub fn apply(&mut self) {
        for block in &mut self.blocks {
            if let Block::Element(el) = block {
                el.unhide();
            }
        }

        let collapsed: Vec<usize> = self
            .headings()
            .into_iter()
            .filter(|&i| self.element(i).is_some_and(ElementBlock::is_collapsed))
            .collect();
        for idx in collapsed {
            self.collapse_after(idx);
        }
    }

    /// Flips the collapsed flag of the heading at `idx` and re-applies.
    /// Returns the new flag, or `None` when `idx` is not a heading.
    pub fn toggle(&mut self, idx: usize) -> Option<bool> {
        let Some(Block::Element(el)) = self.blocks.get_mut(idx) else {
            return None;
        };
        el.heading_level()?;
        let collapsed = !el.is_collapsed();
        el.set_attr(COLLAPSED_ATTR, collapsed.to_string());
        self.apply();
        Some(collapsed)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Element(el) => el.to_html(&mut out),
                Block::Text(text) => out.push_str(&escape_text(text)),
                Block::Comment(comment) => {
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
            }
        }
        out
    }
}

/// Re-applies the collapse pass to stored HTML. Markup without collapse
/// attributes is returned untouched.
pub fn normalize(html: &str) -> String {
    if !html.contains(COLLAPSED_ATTR) && !html.contains(HIDDEN_ATTR) {
        return html.to_string();
    }
    let mut doc = CollapsibleDocument::parse(html);
    doc.apply();
    doc.to_html()
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
