use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use strum::IntoEnumIterator;

use crate::config::SiteConfig;
use crate::content::{bilingual, escape_markup, Lang};
use crate::models::{Archive, PageName, Post, Work};
use crate::{excerpt, ApiError, AppState};

pub const RSS_ITEM_LIMIT: usize = 20;
const RSS_DESCRIPTION_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
}

impl FeedItem {
    fn from_post(site: &SiteConfig, post: &Post) -> Self {
        FeedItem {
            title: post.title.clone(),
            link: format!("{}/posts/{}", site.url, post.id),
            description: korean_excerpt(&post.content),
            published_at: post.created_at,
        }
    }

    fn from_archive(site: &SiteConfig, archive: &Archive) -> Self {
        FeedItem {
            title: archive.title.clone(),
            link: format!("{}/archive/{}", site.url, archive.id),
            description: korean_excerpt(&archive.content),
            published_at: archive.created_at,
        }
    }
}

/// The channel is Korean, so bilingual blobs contribute their Korean side only.
fn korean_excerpt(content: &str) -> String {
    excerpt(bilingual::split(content).pick(Lang::Ko), RSS_DESCRIPTION_CHARS)
}

/// Posts and published archives merged newest first, capped at
/// [`RSS_ITEM_LIMIT`].
pub fn feed_items(site: &SiteConfig, posts: &[Post], archives: &[Archive]) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = posts
        .iter()
        .map(|p| FeedItem::from_post(site, p))
        .chain(
            archives
                .iter()
                .filter(|a| a.published)
                .map(|a| FeedItem::from_archive(site, a)),
        )
        .collect();
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items.truncate(RSS_ITEM_LIMIT);
    items
}

pub fn render_rss(site: &SiteConfig, items: &[FeedItem]) -> String {
    let last_build = items
        .first()
        .map(|i| i.published_at)
        .unwrap_or_else(Utc::now)
        .to_rfc2822();

    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str("\n<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n<channel>\n");
    xml.push_str(&format!("<title>{}</title>\n", escape_markup(&site.title)));
    xml.push_str(&format!("<link>{}/</link>\n", escape_markup(&site.url)));
    xml.push_str(&format!(
        "<description>{}</description>\n",
        escape_markup(&site.description)
    ));
    xml.push_str("<language>ko</language>\n");
    xml.push_str(&format!("<lastBuildDate>{}</lastBuildDate>\n", last_build));
    xml.push_str(&format!(
        "<atom:link href=\"{}/rss.xml\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape_markup(&site.url)
    ));

    for item in items {
        let link = escape_markup(&item.link);
        xml.push_str("<item>\n");
        xml.push_str(&format!("<title>{}</title>\n", escape_markup(&item.title)));
        xml.push_str(&format!("<link>{}</link>\n", link));
        xml.push_str(&format!("<guid isPermaLink=\"true\">{}</guid>\n", link));
        xml.push_str(&format!(
            "<description>{}</description>\n",
            escape_markup(&item.description)
        ));
        xml.push_str(&format!("<pubDate>{}</pubDate>\n", item.published_at.to_rfc2822()));
        xml.push_str("</item>\n");
    }

    xml.push_str("</channel>\n</rss>\n");
    xml
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
}

/// Static pages first, then posts, published works and published archives.
pub fn sitemap_entries(
    site: &SiteConfig,
    posts: &[Post],
    works: &[Work],
    archives: &[Archive],
) -> Vec<SitemapEntry> {
    let pages = PageName::iter().map(|page| SitemapEntry {
        loc: format!("{}{}", site.url, page.path()),
        lastmod: None,
    });
    let posts = posts.iter().map(|p| SitemapEntry {
        loc: format!("{}/posts/{}", site.url, p.id),
        lastmod: Some(p.updated_at),
    });
    let works = works.iter().filter(|w| w.published).map(|w| SitemapEntry {
        loc: format!("{}/work/{}", site.url, w.id),
        lastmod: Some(w.updated_at),
    });
    let archives = archives.iter().filter(|a| a.published).map(|a| SitemapEntry {
        loc: format!("{}/archive/{}", site.url, a.id),
        lastmod: Some(a.updated_at),
    });

    pages.chain(posts).chain(works).chain(archives).collect()
}

pub fn render_sitemap(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str("\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for entry in entries {
        xml.push_str("<url>");
        xml.push_str(&format!("<loc>{}</loc>", escape_markup(&entry.loc)));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!("<lastmod>{}</lastmod>", lastmod.format("%Y-%m-%d")));
        }
        xml.push_str("</url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], body).into_response()
}

pub async fn rss(State(state): State<AppState>) -> Result<Response, ApiError> {
    tracing::info!("rss started");
    let posts = state.store.list_posts().await?;
    let archives = state.store.list_archives(false).await?;

    let site = &state.config.site;
    let items = feed_items(site, &posts, &archives);
    Ok(xml_response(render_rss(site, &items)))
}

pub async fn sitemap(State(state): State<AppState>) -> Result<Response, ApiError> {
    tracing::info!("sitemap started");
    let posts = state.store.list_posts().await?;
    let works = state.store.list_works(false).await?;
    let archives = state.store.list_archives(false).await?;

    let entries = sitemap_entries(&state.config.site, &posts, &works, &archives);
    Ok(xml_response(render_sitemap(&entries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArchiveCategory;
    use chrono::TimeZone;

    fn site() -> SiteConfig {
        SiteConfig {
            url: "https://folio.example".to_string(),
            title: "folio & co".to_string(),
            description: "Notes".to_string(),
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    fn post(id: &str, day: u32) -> Post {
        Post {
            id: id.to_string(),
            title: format!("Post <{}>", id),
            content: "<p>Body text</p>".to_string(),
            created_at: at(day),
            updated_at: at(day),
        }
    }

    fn archive(id: &str, day: u32, published: bool) -> Archive {
        Archive {
            id: id.to_string(),
            title: format!("Archive {}", id),
            content: "<p>Review</p>".to_string(),
            category: ArchiveCategory::Book,
            tags: vec![],
            rating: Some(4),
            published,
            created_at: at(day),
            updated_at: at(day),
        }
    }

    #[test]
    fn feed_merges_newest_first_and_skips_drafts() {
        let posts = vec![post("p1", 1), post("p2", 5)];
        let archives = vec![archive("a1", 3, true), archive("a2", 9, false)];

        let items = feed_items(&site(), &posts, &archives);
        let links: Vec<_> = items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://folio.example/posts/p2",
                "https://folio.example/archive/a1",
                "https://folio.example/posts/p1",
            ]
        );
    }

    #[test]
    fn feed_is_capped() {
        let posts: Vec<_> = (1..=28).map(|d| post(&format!("p{}", d), d)).collect();
        let items = feed_items(&site(), &posts, &[]);
        assert_eq!(items.len(), RSS_ITEM_LIMIT);
        assert_eq!(items[0].published_at, at(28));
    }

    #[test]
    fn rss_is_escaped() {
        let items = feed_items(&site(), &[post("p1", 12)], &[]);
        let xml = render_rss(&site(), &items);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<title>folio &amp; co</title>"));
        assert!(xml.contains("<title>Post &lt;p1&gt;</title>"));
        assert!(xml.contains("<description>Body text</description>"));
        assert!(xml.contains("<pubDate>Tue, 12 Mar 2024 09:00:00 +0000</pubDate>"));
    }

    #[test]
    fn sitemap_lists_pages_and_published_records() {
        let entries = sitemap_entries(
            &site(),
            &[post("p1", 2)],
            &[],
            &[archive("a1", 3, true), archive("a2", 4, false)],
        );
        let xml = render_sitemap(&entries);

        assert!(xml.contains("<url><loc>https://folio.example/</loc></url>"));
        assert!(xml.contains("<url><loc>https://folio.example/about</loc></url>"));
        assert!(xml.contains(
            "<url><loc>https://folio.example/posts/p1</loc><lastmod>2024-03-02</lastmod></url>"
        ));
        assert!(xml.contains("https://folio.example/archive/a1"));
        assert!(!xml.contains("a2"));
    }

    #[test]
    fn bilingual_description_uses_the_korean_side() {
        let mut item = post("p1", 12);
        item.content = bilingual::build("<p>안녕하세요</p>", "<p>Hello</p>");
        let items = feed_items(&site(), &[item], &[]);
        assert_eq!(items[0].description, "안녕하세요");
    }
}
