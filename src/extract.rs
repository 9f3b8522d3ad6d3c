//! Locate content images in a parsed page.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::form_urlencoded;
use url::Url;

use crate::error::{FeedError, Result};

/// Path fragment every content image lives under.
pub const UPLOADS_MARKER: &str = "uploads/";

/// Structural selectors, tried in order. Matches are pooled across all of
/// them; the first selector to reach an image decides its position.
const CANDIDATE_SELECTORS: &[&str] = &[
    "img[src*='uploads/']",
    "a[href*='uploads/'] img",
    ".entry-content img",
    ".post-content img",
    "article img",
    "figure.wp-block-image img",
    ".wp-caption img",
    "figure img",
    ".gallery .gallery-item img",
    ".wp-block-gallery img",
    ".tiled-gallery img",
    ".cartoon img",
    "main img",
    ".content img",
    "img[data-lazy-src], img[data-src]",
];

/// Attributes consulted, in order, for the image location. Lazy-loading
/// themes park the real URL in a `data-*` attribute.
const SOURCE_ATTRIBUTES: &[&str] = &["src", "data-lazy-src", "data-src", "data-orig-file"];

/// Substrings marking site furniture rather than content.
const DENY_SUBSTRINGS: &[&str] = &[
    "thumbnail",
    "avatar",
    "logo",
    "icon",
    "banner",
    "header",
    "footer",
    "sidebar",
    "gravatar",
    "/themes/",
    "/plugins/",
];

/// Fixed small-dimension renditions generated by the CMS.
const DENY_SIZE_SUFFIXES: &[&str] = &[
    "-32x32", "-50x50", "-64x64", "-96x96", "-100x100", "-150x150", "-180x180",
];

/// A matched image element, not yet described.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub url: Url,
    pub element: ElementRef<'a>,
}

pub struct CandidateExtractor {
    selectors: Vec<Selector>,
}

impl CandidateExtractor {
    pub fn new() -> Result<Self> {
        let selectors = CANDIDATE_SELECTORS
            .iter()
            .map(|s| Selector::parse(s).map_err(|_| FeedError::Selector(s.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { selectors })
    }

    /// Every distinct content image on the page, in selector order then
    /// document order.
    pub fn extract<'a>(&self, document: &'a Html, base: &Url) -> Vec<Candidate<'a>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for selector in &self.selectors {
            for element in document.select(selector) {
                let Some(url) = candidate_url(&element, base) else {
                    continue;
                };
                if !seen.insert(canonical_key(&url)) {
                    continue;
                }
                debug!(%url, "candidate image");
                candidates.push(Candidate { url, element });
            }
        }

        candidates
    }
}

/// Resolve and vet an image element's location.
fn candidate_url(element: &ElementRef<'_>, base: &Url) -> Option<Url> {
    let src = source_attribute(element)?;
    if !src.contains(UPLOADS_MARKER) {
        return None;
    }
    let url = base.join(src.trim()).ok()?;
    if is_denied(&url) {
        debug!(%url, "skipping furniture image");
        return None;
    }
    Some(url)
}

fn source_attribute<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    SOURCE_ATTRIBUTES
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty() && !v.starts_with("data:"))
}

/// Whether the URL looks like a thumbnail, avatar, theme asset or similar.
pub fn is_denied(url: &Url) -> bool {
    let lower = url.as_str().to_lowercase();
    DENY_SUBSTRINGS.iter().any(|d| lower.contains(d))
        || DENY_SIZE_SUFFIXES.iter().any(|d| lower.contains(d))
}

/// Key used for duplicate detection: fragment dropped, tracking query
/// parameters removed.
pub fn canonical_key(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    if let Some(q) = u.query() {
        let pairs = form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .filter(|(k, _)| {
                let kl = k.to_lowercase();
                !(kl.starts_with("utm_") || kl == "fbclid" || kl == "gclid")
            })
            .collect::<Vec<(String, String)>>();
        if pairs.is_empty() {
            u.set_query(None);
        } else {
            let mut ser = form_urlencoded::Serializer::new(String::new());
            for (k, v) in pairs {
                ser.append_pair(&k, &v);
            }
            let newq = ser.finish();
            u.set_query(Some(&newq));
        }
    }
    u.into()
}
