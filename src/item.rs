use chrono::NaiveDate;
use url::Url;

/// One dated, titled image destined for a feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Absolute image URL; unique within a run.
    pub url: Url,
    pub title: String,
    pub description: String,
    pub published_at: NaiveDate,
    /// Last path segment of `url`. Informational only.
    pub source_filename: String,
}

impl ContentItem {
    pub fn new(url: Url, title: String, description: String, published_at: NaiveDate) -> Self {
        let source_filename = filename_of(&url);
        Self {
            url,
            title,
            description,
            published_at,
            source_filename,
        }
    }
}

/// Last non-empty path segment of a URL, percent-decoded, or an empty
/// string. Segments that do not decode to UTF-8 are returned as is.
pub fn filename_of(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
        .unwrap_or("");
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}
