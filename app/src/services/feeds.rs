// storefront/app/src/services/feeds.rs

//! RSS feed and XML sitemap for published blog articles.

use std::fmt::Write;

use crate::models::Article;

pub const FEED_SIZE: usize = 5;
pub const FEED_TITLE: &str = "Blog articles (latest)";
pub const FEED_DESCRIPTION: &str = "Updates on changes and additions to blog articles";
const ITEM_DESCRIPTION_LEN: usize = 200;
const SITEMAP_CHANGEFREQ: &str = "never";
const SITEMAP_PRIORITY: &str = "0.5";

/// RSS 2.0 document. `base_url` has no trailing slash.
pub fn rss_feed(articles: &[Article], base_url: &str) -> String {
  let mut out = String::new();
  out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
  out.push_str("<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\"><channel>");
  let _ = write!(
    out,
    "<title>{}</title><link>{}/blog/articles/</link><description>{}</description>",
    escape(FEED_TITLE),
    escape(base_url),
    escape(FEED_DESCRIPTION)
  );
  let _ = write!(
    out,
    "<atom:link href=\"{}/blog/articles/latest/feed/\" rel=\"self\"></atom:link><language>en-us</language>",
    escape(base_url)
  );
  if let Some(date) = articles.iter().filter_map(|a| a.published_date).max() {
    let _ = write!(out, "<lastBuildDate>{}</lastBuildDate>", date.to_rfc2822());
  }
  for article in articles {
    let link = format!("{}{}", base_url, article.path());
    let description: String = article.body.chars().take(ITEM_DESCRIPTION_LEN).collect();
    let _ = write!(
      out,
      "<item><title>{}</title><link>{}</link><description>{}</description>",
      escape(&article.title),
      escape(&link),
      escape(&description)
    );
    if let Some(date) = article.published_date {
      let _ = write!(out, "<pubDate>{}</pubDate>", date.to_rfc2822());
    }
    let _ = write!(out, "<guid>{}</guid></item>", escape(&link));
  }
  out.push_str("</channel></rss>");
  out
}

pub fn sitemap(articles: &[Article], base_url: &str) -> String {
  let mut out = String::new();
  out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
  out.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">");
  for article in articles {
    let _ = write!(out, "<url><loc>{}{}</loc>", escape(base_url), escape(&article.path()));
    if let Some(date) = article.published_date {
      let _ = write!(out, "<lastmod>{}</lastmod>", date.format("%Y-%m-%d"));
    }
    let _ = write!(
      out,
      "<changefreq>{}</changefreq><priority>{}</priority></url>",
      SITEMAP_CHANGEFREQ, SITEMAP_PRIORITY
    );
  }
  out.push_str("</urlset>");
  out
}

pub fn escape(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      _ => out.push(c),
    }
  }
  out
}
