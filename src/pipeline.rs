//! One complete run: scrape (or fall back), normalize, render, write.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use scraper::Html;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{FeedError, Result};
use crate::extract::CandidateExtractor;
use crate::fallback;
use crate::feed::FeedDocument;
use crate::fetch::PageSource;
use crate::infer::Inferencer;
use crate::item::ContentItem;
use crate::normalize::normalize;
use crate::output::write_atomically;
use crate::text::decode_html;

/// Where a run's items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Live,
    Fallback,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Live => write!(f, "live"),
            Origin::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub item_count: usize,
    pub origin: Origin,
    pub newest: NaiveDate,
    pub oldest: NaiveDate,
    pub bytes_written: u64,
    pub elapsed: Duration,
    pub output_path: PathBuf,
}

impl RunReport {
    pub fn log_summary(&self) {
        info!("---- feed summary ----");
        info!("items:      {} ({})", self.item_count, self.origin);
        info!("date range: {} .. {}", self.oldest, self.newest);
        info!("file:       {} ({} bytes)", self.output_path.display(), self.bytes_written);
        info!("elapsed:    {:.2?}", self.elapsed);
    }

    /// `key=value` pairs for downstream workflow steps.
    pub fn ci_outputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("item_count", self.item_count.to_string()),
            ("used_fallback", (self.origin == Origin::Fallback).to_string()),
            ("newest_date", self.newest.to_string()),
            ("oldest_date", self.oldest.to_string()),
            ("feed_path", self.output_path.display().to_string()),
            ("feed_bytes", self.bytes_written.to_string()),
        ]
    }
}

/// Fetch and parse the source page into items, without normalizing.
pub fn scrape(settings: &Settings, source: &dyn PageSource, today: NaiveDate) -> Result<Vec<ContentItem>> {
    let page = source.fetch(&settings.source_url)?;
    let html = decode_html(&page.body);
    let document = Html::parse_document(&html);

    // Relative sources resolve against where the page was actually served.
    let extractor = CandidateExtractor::new()?;
    let candidates = extractor.extract(&document, &page.url);
    info!(count = candidates.len(), "found candidate images");
    if candidates.is_empty() {
        return Err(FeedError::NoCandidates(settings.source_url.to_string()));
    }

    let inferencer = Inferencer::new(today);
    Ok(candidates.iter().map(|c| inferencer.infer(c)).collect())
}

/// Scrape the source, substituting the fallback dataset on any recoverable
/// failure. The result is deduplicated and sorted newest first.
pub fn collect_items<R: Rng>(
    settings: &Settings,
    source: &dyn PageSource,
    today: NaiveDate,
    rng: &mut R,
) -> Result<(Vec<ContentItem>, Origin)> {
    match scrape(settings, source, today) {
        Ok(items) => Ok((normalize(items), Origin::Live)),
        Err(e) if e.is_recoverable() => {
            warn!(error = %e, "scraping failed, publishing fallback items");
            let items = fallback::generate(&settings.source_url, today, rng)?;
            Ok((normalize(items), Origin::Fallback))
        }
        Err(e) => Err(e),
    }
}

/// Run the whole pipeline and write the feed to `settings.output_path`.
pub fn run<R: Rng>(
    settings: &Settings,
    source: &dyn PageSource,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<RunReport> {
    let started = Instant::now();
    info!(url = %settings.source_url, "building feed");

    let (items, origin) = collect_items(settings, source, now.date_naive(), rng)?;
    let (Some(newest), Some(oldest)) = (items.first(), items.last()) else {
        return Err(FeedError::NoItems);
    };
    let (newest, oldest) = (newest.published_at, oldest.published_at);
    let item_count = items.len();
    info!(item_count, %origin, "items ready");

    let xml = FeedDocument::new(settings.channel.clone(), items, now).render()?;
    let bytes_written = write_atomically(&settings.output_path, xml.as_bytes())?;
    info!(path = %settings.output_path.display(), bytes = bytes_written, "feed written");

    Ok(RunReport {
        item_count,
        origin,
        newest,
        oldest,
        bytes_written,
        elapsed: started.elapsed(),
        output_path: settings.output_path.clone(),
    })
}
