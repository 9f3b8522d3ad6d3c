//! RSS 2.0 rendering.

use std::error::Error;
use std::io::Write;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use quick_xml::escape::escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::config::ChannelMeta;
use crate::error::{FeedError, Result};
use crate::item::ContentItem;
use crate::text::strip_control_chars;

const GENERATOR: &str = concat!("cartoon2rss ", env!("CARGO_PKG_VERSION"));
const RSS_DOCS: &str = "https://www.rssboard.org/rss-specification";
const TTL_MINUTES: &str = "720";

type XmlResult = std::result::Result<(), Box<dyn Error>>;

/// A channel plus its items, ready to serialize.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub channel: ChannelMeta,
    /// Newest first.
    pub items: Vec<ContentItem>,
    pub built_at: DateTime<Utc>,
}

impl FeedDocument {
    pub fn new(channel: ChannelMeta, items: Vec<ContentItem>, built_at: DateTime<Utc>) -> Self {
        Self {
            channel,
            items,
            built_at,
        }
    }

    pub fn render(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_document(&mut writer)
            .map_err(|e| FeedError::Render(e.to_string()))?;
        let mut out = writer.into_inner();
        out.push(b'\n');
        String::from_utf8(out).map_err(|e| FeedError::Render(e.to_string()))
    }

    fn write_document<W: Write>(&self, w: &mut Writer<W>) -> XmlResult {
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        rss.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
        rss.push_attribute(("xmlns:dc", "http://purl.org/dc/elements/1.1/"));
        rss.push_attribute(("xmlns:media", "http://search.yahoo.com/mrss/"));
        rss.push_attribute(("xmlns:content", "http://purl.org/rss/1.0/modules/content/"));
        w.write_event(Event::Start(rss))?;
        w.write_event(Event::Start(BytesStart::new("channel")))?;
        self.write_channel_meta(w)?;

        for item in &self.items {
            self.write_item(w, item)?;
        }

        w.write_event(Event::End(BytesEnd::new("channel")))?;
        w.write_event(Event::End(BytesEnd::new("rss")))?;
        Ok(())
    }

    fn write_channel_meta<W: Write>(&self, w: &mut Writer<W>) -> XmlResult {
        let ch = &self.channel;
        let pub_date = self
            .items
            .first()
            .map(|i| date_to_rfc1123(i.published_at))
            .unwrap_or_else(|| rfc1123(&self.built_at));

        write_text_element(w, "title", &ch.title)?;
        write_text_element(w, "link", &ch.link)?;
        write_text_element(w, "description", &ch.description)?;
        write_text_element(w, "language", &ch.language)?;
        write_text_element(w, "lastBuildDate", &rfc1123(&self.built_at))?;
        write_text_element(w, "pubDate", &pub_date)?;
        write_text_element(w, "generator", GENERATOR)?;
        write_text_element(w, "docs", RSS_DOCS)?;
        write_text_element(w, "ttl", TTL_MINUTES)?;
        write_empty_element(
            w,
            "atom:link",
            &[("href", ch.self_url.as_str()), ("rel", "self"), ("type", "application/rss+xml")],
        )?;

        let image_url = self
            .items
            .first()
            .map(|i| i.url.to_string())
            .unwrap_or_else(|| ch.favicon_url.clone());
        w.write_event(Event::Start(BytesStart::new("image")))?;
        write_text_element(w, "url", &image_url)?;
        write_text_element(w, "title", &ch.title)?;
        write_text_element(w, "link", &ch.link)?;
        w.write_event(Event::End(BytesEnd::new("image")))?;

        for category in &ch.categories {
            write_text_element(w, "category", category)?;
        }
        Ok(())
    }

    fn write_item<W: Write>(&self, w: &mut Writer<W>, item: &ContentItem) -> XmlResult {
        let url = item.url.as_str();
        let mime = mime_for(&item.source_filename);

        w.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(w, "title", &item.title)?;
        write_text_element(w, "link", url)?;
        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        w.write_event(Event::Start(guid))?;
        w.write_event(Event::Text(BytesText::new(url)))?;
        w.write_event(Event::End(BytesEnd::new("guid")))?;
        write_text_element(w, "pubDate", &date_to_rfc1123(item.published_at))?;
        write_text_element(w, "dc:date", &item.published_at.format("%Y-%m-%d").to_string())?;
        write_cdata_element(w, "description", &short_html(item))?;
        write_cdata_element(w, "content:encoded", &long_html(item, &self.channel))?;
        write_empty_element(w, "enclosure", &[("url", url), ("type", mime), ("length", "0")])?;

        let mut media = BytesStart::new("media:content");
        media.push_attribute(("url", url));
        media.push_attribute(("medium", "image"));
        media.push_attribute(("type", mime));
        w.write_event(Event::Start(media))?;
        write_typed_text_element(w, "media:title", &item.title)?;
        write_typed_text_element(w, "media:description", &item.description)?;
        w.write_event(Event::End(BytesEnd::new("media:content")))?;
        write_empty_element(w, "media:thumbnail", &[("url", url)])?;

        if let Some(category) = self.channel.categories.first() {
            write_text_element(w, "category", category)?;
        }
        w.write_event(Event::End(BytesEnd::new("item")))?;
        Ok(())
    }
}

fn write_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> XmlResult {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    // BytesText::new escapes; the text must not be pre-escaped.
    w.write_event(Event::Text(BytesText::new(&strip_control_chars(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_typed_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> XmlResult {
    let mut start = BytesStart::new(name);
    start.push_attribute(("type", "plain"));
    w.write_event(Event::Start(start))?;
    w.write_event(Event::Text(BytesText::new(&strip_control_chars(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_cdata_element<W: Write>(w: &mut Writer<W>, name: &str, html: &str) -> XmlResult {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::CData(BytesCData::new(strip_control_chars(html))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_empty_element<W: Write>(w: &mut Writer<W>, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
    let mut el = BytesStart::new(name);
    for &(key, value) in attrs {
        el.push_attribute((key, value));
    }
    w.write_event(Event::Empty(el))?;
    Ok(())
}

/// Inline HTML for `<description>`. Every interpolation goes through
/// `escape` exactly once.
fn short_html(item: &ContentItem) -> String {
    let url = escape(item.url.as_str());
    format!(
        "<p><a href=\"{url}\"><img src=\"{url}\" alt=\"{alt}\" style=\"max-width:100%;height:auto;\"/></a></p><p>{desc}</p>",
        url = url,
        alt = escape(&item.title),
        desc = escape(&item.description),
    )
}

/// Inline HTML for `<content:encoded>`.
fn long_html(item: &ContentItem, channel: &ChannelMeta) -> String {
    let url = escape(item.url.as_str());
    format!(
        concat!(
            "<div style=\"font-family:sans-serif;max-width:800px;\">",
            "<figure style=\"margin:0;\">",
            "<a href=\"{url}\"><img src=\"{url}\" alt=\"{alt}\" style=\"max-width:100%;height:auto;border:1px solid #ddd;\"/></a>",
            "<figcaption style=\"font-weight:bold;margin-top:8px;\">{title}</figcaption>",
            "</figure>",
            "<p>{desc}</p>",
            "<p style=\"color:#666;font-size:0.9em;\">Published {date} &middot; {file}</p>",
            "<hr/>",
            "<p style=\"color:#999;font-size:0.8em;\">Source: <a href=\"{source}\">{source}</a> &middot; ",
            "Feed generated by <a href=\"{repo}\">cartoon2rss</a> &middot; <a href=\"{home}\">Feed home</a></p>",
            "</div>"
        ),
        url = url,
        alt = escape(&item.title),
        title = escape(&item.title),
        desc = escape(&item.description),
        date = escape(&item.published_at.format("%B %-d, %Y").to_string()),
        file = escape(&item.source_filename),
        source = escape(&channel.link),
        repo = escape(&channel.repository_url),
        home = escape(&channel.home_url),
    )
}

fn rfc1123(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn date_to_rfc1123(date: NaiveDate) -> String {
    rfc1123(&date.and_time(NaiveTime::MIN).and_utc())
}

fn mime_for(filename: &str) -> &'static str {
    let ext = filename.rsplit_once('.').map(|(_, e)| e.to_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "image/jpeg",
    }
}
