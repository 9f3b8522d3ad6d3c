//! Derive title, description and publication date for a candidate image.
//!
//! Each field comes from an ordered chain of clues. A clue pulls a raw
//! string out of the markup around the image; the first one whose output
//! passes the field's acceptance check wins. When nothing survives, the
//! value is synthesised from the URL.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Selector};
use url::Url;

use crate::extract::Candidate;
use crate::item::{filename_of, ContentItem};
use crate::text::{collapse_whitespace, normalize, truncate_chars};

pub const TITLE_MAX_CHARS: usize = 80;
pub const DESCRIPTION_MAX_CHARS: usize = 200;
const FILENAME_TITLE_MAX_CHARS: usize = 50;
const GENERIC_TITLE: &str = "Untitled cartoon";
const ELLIPSIS: &str = "...";
const EARLIEST_YEAR: i32 = 2000;

/// Fragments that betray a raw file path rather than prose.
const PATH_MARKERS: &[&str] = &["wp-content", "uploads/"];

/// Wrapper classes that carry a caption for the image inside them.
const CAPTION_WRAPPER_CLASSES: &[&str] = &[
    "wp-caption",
    "wp-block-image",
    "gallery-item",
    "blocks-gallery-item",
    "tiled-gallery-item",
];

/// How many levels up the wrapper search climbs.
const WRAPPER_DEPTH: usize = 4;

static CAPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("figcaption, .wp-caption-text, .wp-element-caption, .gallery-caption, .caption").unwrap()
});
static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, .entry-title, .post-title").unwrap());
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

static RE_TITLE_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-.,!?]").unwrap());
static RE_LEADING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").unwrap());
static RE_SIZE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(-\d+x\d+|-scaled)+$").unwrap());
static RE_CAMEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());

/// Pulls a raw string out of the markup around an image.
type Clue = fn(&ElementRef<'_>) -> Option<String>;

/// Walk `clues` in order; normalize each hit, keep it if `accept` agrees
/// and `finish` can shape it into a final value.
fn first_accepted(
    element: &ElementRef<'_>,
    clues: &[Clue],
    accept: fn(&str) -> bool,
    finish: fn(&str) -> Option<String>,
) -> Option<String> {
    clues
        .iter()
        .filter_map(|clue| clue(element))
        .map(|raw| normalize(&raw))
        .filter(|s| accept(s))
        .find_map(|s| finish(&s))
}

const TITLE_CLUES: &[Clue] = &[
    alt_attribute,
    title_attribute,
    following_caption,
    wrapper_caption,
    article_heading,
];

const DESCRIPTION_CLUES: &[Clue] = &[
    following_caption,
    wrapper_caption,
    title_attribute,
    article_first_paragraph,
];

/// Turns candidates into [`ContentItem`]s. `today` stands in for "now"
/// whenever a date cannot be read off the URL.
pub struct Inferencer {
    today: NaiveDate,
}

impl Inferencer {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn infer(&self, candidate: &Candidate<'_>) -> ContentItem {
        let title = infer_title(&candidate.element, &candidate.url);
        let description = infer_description(&candidate.element, &title);
        let published_at = date_from_url(candidate.url.as_str(), self.today).unwrap_or(self.today);
        ContentItem::new(candidate.url.clone(), title, description, published_at)
    }
}

pub fn infer_title(element: &ElementRef<'_>, url: &Url) -> String {
    first_accepted(element, TITLE_CLUES, accept_title, finish_title)
        .unwrap_or_else(|| title_from_filename(&filename_of(url)))
}

pub fn infer_description(element: &ElementRef<'_>, title: &str) -> String {
    first_accepted(element, DESCRIPTION_CLUES, accept_description, finish_description)
        .unwrap_or_else(|| format!("New cartoon: {}", title))
}

fn contains_path_marker(s: &str) -> bool {
    let lower = s.to_lowercase();
    PATH_MARKERS.iter().any(|m| lower.contains(m))
}

fn accept_title(s: &str) -> bool {
    let len = s.chars().count();
    if len <= 3 || len >= 100 {
        return false;
    }
    if s.eq_ignore_ascii_case("cartoon") {
        return false;
    }
    if s.chars().filter(|c| !c.is_whitespace()).all(|c| c.is_ascii_digit()) {
        return false;
    }
    !contains_path_marker(s)
}

/// Strip to a conservative character set; fewer than four characters left
/// means the candidate was mostly punctuation.
fn finish_title(s: &str) -> Option<String> {
    let cleaned = collapse_whitespace(&RE_TITLE_DISALLOWED.replace_all(s, ""));
    let cleaned = truncate_chars(&cleaned, TITLE_MAX_CHARS).trim_end().to_string();
    (cleaned.chars().count() >= 4).then_some(cleaned)
}

fn accept_description(s: &str) -> bool {
    let len = s.chars().count();
    (11..=500).contains(&len) && !s.to_lowercase().contains("image") && !contains_path_marker(s)
}

fn finish_description(s: &str) -> Option<String> {
    if s.chars().count() <= DESCRIPTION_MAX_CHARS {
        return Some(s.to_string());
    }
    let keep = DESCRIPTION_MAX_CHARS - ELLIPSIS.len();
    Some(format!("{}{}", truncate_chars(s, keep).trim_end(), ELLIPSIS))
}

/// `2019_quantumMechanics-1024x768.jpg` -> `Quantum Mechanics`.
pub fn title_from_filename(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);
    let stem = RE_SIZE_SUFFIX.replace(stem, "");
    let stem = RE_LEADING_DIGITS.replace(&stem, "");
    let spaced = stem.replace(['_', '-'], " ");
    let spaced = RE_CAMEL.replace_all(&spaced, "$1 $2");
    let words = collapse_whitespace(&spaced)
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    let title = truncate_chars(&words, FILENAME_TITLE_MAX_CHARS).trim().to_string();
    if title.is_empty() {
        GENERIC_TITLE.to_string()
    } else {
        title
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ----- clues -----

fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn class_of(element: &ElementRef<'_>) -> String {
    element.value().attr("class").unwrap_or("").to_lowercase()
}

fn ancestors<'a>(element: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.ancestors().filter_map(ElementRef::wrap)
}

fn alt_attribute(element: &ElementRef<'_>) -> Option<String> {
    element.value().attr("alt").map(str::to_string)
}

fn title_attribute(element: &ElementRef<'_>) -> Option<String> {
    element.value().attr("title").map(str::to_string)
}

fn is_caption_like(element: &ElementRef<'_>) -> bool {
    element.value().name() == "figcaption" || class_of(element).contains("caption")
}

/// First caption-like sibling after the image, or after the link wrapping it.
fn following_caption(element: &ElementRef<'_>) -> Option<String> {
    let mut anchors = vec![*element];
    if let Some(parent) = element.parent().and_then(ElementRef::wrap) {
        if parent.value().name() == "a" {
            anchors.push(parent);
        }
    }
    anchors.iter().find_map(|anchor| {
        anchor
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(is_caption_like)
            .and_then(element_text)
    })
}

/// Caption inside the nearest figure or caption wrapper.
fn wrapper_caption(element: &ElementRef<'_>) -> Option<String> {
    ancestors(element)
        .take(WRAPPER_DEPTH)
        .filter(|a| {
            let class = class_of(a);
            a.value().name() == "figure" || CAPTION_WRAPPER_CLASSES.iter().any(|c| class.contains(c))
        })
        .find_map(|wrapper| wrapper.select(&CAPTION_SELECTOR).find_map(element_text))
}

fn is_post_container(element: &ElementRef<'_>) -> bool {
    if element.value().name() == "article" {
        return true;
    }
    let class = class_of(element);
    class.split_whitespace().any(|c| c == "post" || c == "hentry" || c.starts_with("post-") || c == "entry")
}

fn article_heading(element: &ElementRef<'_>) -> Option<String> {
    ancestors(element)
        .filter(is_post_container)
        .find_map(|post| post.select(&HEADING_SELECTOR).find_map(element_text))
}

fn article_first_paragraph(element: &ElementRef<'_>) -> Option<String> {
    ancestors(element)
        .filter(is_post_container)
        .find_map(|post| post.select(&PARAGRAPH_SELECTOR).find_map(element_text))
}

// ----- dates -----

/// Calendar precision a pattern's captures carry.
#[derive(Debug, Clone, Copy)]
enum DatePrecision {
    Day,
    Month,
    Year,
}

/// Most specific first.
static DATE_PATTERNS: Lazy<Vec<(Regex, DatePrecision)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"/(\d{4})/(\d{1,2})/(\d{1,2})/").unwrap(), DatePrecision::Day),
        (Regex::new(r"/(\d{4})/(\d{1,2})/").unwrap(), DatePrecision::Month),
        (Regex::new(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:\D|$)").unwrap(), DatePrecision::Day),
        (Regex::new(r"(?:^|\D)(\d{4})[-_.](\d{1,2})[-_.](\d{1,2})(?:\D|$)").unwrap(), DatePrecision::Day),
        (Regex::new(r"/(\d{4})/").unwrap(), DatePrecision::Year),
    ]
});

/// Read a plausible date off a URL. Every match of every pattern is tried,
/// overlapping ones included, most specific pattern first; the first that
/// forms a real calendar date between 2000 and next year wins.
pub fn date_from_url(url: &str, today: NaiveDate) -> Option<NaiveDate> {
    let latest_year = today.year() + 1;
    DATE_PATTERNS.iter().find_map(|(re, precision)| {
        overlapping_captures(re, url).find_map(|caps| {
            let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
            let year = i32::try_from(num(1)?).ok()?;
            let (month, day) = match precision {
                DatePrecision::Day => (num(2)?, num(3)?),
                DatePrecision::Month => (num(2)?, 1),
                DatePrecision::Year => (1, 1),
            };
            if !(EARLIEST_YEAR..=latest_year).contains(&year) {
                return None;
            }
            NaiveDate::from_ymd_opt(year, month, day)
        })
    })
}

/// Like `captures_iter`, but each search resumes one character past the
/// previous match's start, so a rejected `/2023/13/` does not swallow the
/// slash that opens `/2024/05/`.
fn overlapping_captures<'h>(re: &'h Regex, haystack: &'h str) -> impl Iterator<Item = Captures<'h>> + 'h {
    let mut start = 0;
    std::iter::from_fn(move || {
        if start > haystack.len() {
            return None;
        }
        let caps = re.captures_at(haystack, start)?;
        let m = caps.get(0)?;
        start = m.start() + haystack[m.start()..].chars().next().map_or(1, char::len_utf8);
        Some(caps)
    })
}
