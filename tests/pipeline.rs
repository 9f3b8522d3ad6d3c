use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::time::Duration;

use cartoon2rss::config::Environment;
use cartoon2rss::fallback::FALLBACK_LEN;
use cartoon2rss::pipeline::{collect_items, run, Origin};
use cartoon2rss::{FeedError, FetchedPage, PageSource, Result, Settings};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;
use url::Url;

/// Serves a fixed body, or fails every time.
struct StubSource {
    body: Option<Vec<u8>>,
    redirect_to: Option<Url>,
    calls: Cell<u32>,
}

impl StubSource {
    fn serving(html: &str) -> Self {
        Self {
            body: Some(html.as_bytes().to_vec()),
            redirect_to: None,
            calls: Cell::new(0),
        }
    }

    fn redirecting(html: &str, to: &str) -> Self {
        Self {
            redirect_to: Some(Url::parse(to).unwrap()),
            ..Self::serving(html)
        }
    }

    fn unreachable() -> Self {
        Self {
            body: None,
            redirect_to: None,
            calls: Cell::new(0),
        }
    }
}

impl PageSource for StubSource {
    fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        self.calls.set(self.calls.get() + 1);
        match &self.body {
            Some(body) => Ok(FetchedPage {
                url: self.redirect_to.clone().unwrap_or_else(|| url.clone()),
                body: body.clone(),
            }),
            None => Err(FeedError::FetchExhausted {
                url: url.to_string(),
                attempts: 3,
                source: Box::new(FeedError::Status {
                    url: url.to_string(),
                    status: 503,
                }),
            }),
        }
    }
}

const FIXTURE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Cartoon archive</title></head>
<body>
  <header><img src="/wp-content/uploads/2020/01/site-header.png" alt="Site"></header>
  <article class="post">
    <div class="entry-content">
      <figure class="wp-block-image">
        <img src="/wp-content/uploads/2024/03/15/budget-day.jpg" alt="">
        <figcaption>The budget, explained by a very tired accountant</figcaption>
      </figure>
    </div>
  </article>
  <div class="archive">
    <img src="/wp-content/uploads/quantum-mechanics.jpg">
    <img src="/wp-content/uploads/2024/01/portrait-150x150.jpg" alt="Portrait of the artist">
  </div>
</body>
</html>"#;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 5, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    now().date_naive()
}

fn settings(output: &Path) -> Settings {
    Settings::new(
        "https://cartoons.example.org/",
        output.to_path_buf(),
        false,
        Duration::from_secs(15),
        &Environment::default(),
    )
    .unwrap()
}

/// Count `<item>` elements, failing on malformed XML.
fn count_items(xml: &str) -> usize {
    let mut reader = Reader::from_str(xml);
    let mut items = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"item" => items += 1,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("malformed feed: {e}"),
        }
    }
    items
}

#[test]
fn unreachable_source_publishes_fallback() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("docs/feed.xml");
    let source = StubSource::unreachable();
    let mut rng = StdRng::seed_from_u64(42);

    let report = run(&settings(&path), &source, now(), &mut rng).unwrap();

    assert_eq!(source.calls.get(), 1);
    assert_eq!(report.origin, Origin::Fallback);
    assert_eq!(report.item_count, FALLBACK_LEN);
    assert!(report.newest >= report.oldest);

    let xml = fs::read_to_string(&path).unwrap();
    assert_eq!(count_items(&xml), FALLBACK_LEN);
    assert_eq!(report.bytes_written, xml.len() as u64);
}

#[test]
fn fallback_items_are_sorted() {
    let dir = tempdir().unwrap();
    let source = StubSource::unreachable();
    let mut rng = StdRng::seed_from_u64(9);
    let (items, origin) = collect_items(&settings(&dir.path().join("f.xml")), &source, today(), &mut rng).unwrap();
    assert_eq!(origin, Origin::Fallback);
    assert!(items.windows(2).all(|w| w[0].published_at >= w[1].published_at));
}

#[test]
fn fixture_yields_two_items_without_furniture() {
    let dir = tempdir().unwrap();
    let source = StubSource::serving(FIXTURE);
    let mut rng = StdRng::seed_from_u64(1);

    let (items, origin) = collect_items(&settings(&dir.path().join("f.xml")), &source, today(), &mut rng).unwrap();

    assert_eq!(origin, Origin::Live);
    assert_eq!(items.len(), 2);

    // Undated item takes today's date, so it sorts first.
    let bare = &items[0];
    assert_eq!(bare.url.as_str(), "https://cartoons.example.org/wp-content/uploads/quantum-mechanics.jpg");
    assert_eq!(bare.title, "Quantum Mechanics");
    assert_eq!(bare.description, "New cartoon: Quantum Mechanics");
    assert_eq!(bare.published_at, today());

    let captioned = &items[1];
    assert_eq!(captioned.title, "The budget, explained by a very tired accountant");
    assert_eq!(captioned.description, "The budget, explained by a very tired accountant");
    assert_eq!(captioned.published_at, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    assert_eq!(captioned.source_filename, "budget-day.jpg");

    assert!(items.iter().all(|i| !i.url.as_str().contains("150x150")));
}

#[test]
fn relative_sources_resolve_against_redirect_target() {
    let dir = tempdir().unwrap();
    let source = StubSource::redirecting(FIXTURE, "https://www.cartoons.example.org/archive/");
    let mut rng = StdRng::seed_from_u64(1);

    let (items, origin) = collect_items(&settings(&dir.path().join("f.xml")), &source, today(), &mut rng).unwrap();

    assert_eq!(origin, Origin::Live);
    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .all(|i| i.url.host_str() == Some("www.cartoons.example.org")));
    assert_eq!(
        items[0].url.as_str(),
        "https://www.cartoons.example.org/wp-content/uploads/quantum-mechanics.jpg"
    );
}

#[test]
fn fixture_renders_feed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out/feed.xml");
    let source = StubSource::serving(FIXTURE);
    let mut rng = StdRng::seed_from_u64(1);

    let report = run(&settings(&path), &source, now(), &mut rng).unwrap();
    assert_eq!(report.origin, Origin::Live);
    assert_eq!(report.item_count, 2);
    assert_eq!(report.newest, today());
    assert_eq!(report.oldest, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

    let xml = fs::read_to_string(&path).unwrap();
    assert_eq!(count_items(&xml), 2);
    assert!(xml.contains("<title>Quantum Mechanics</title>"));
    assert!(xml.contains("https://cartoon2rss.github.io/cartoon2rss/feed.xml"));

    let outputs = report.ci_outputs();
    assert!(outputs.contains(&("item_count", "2".to_string())));
    assert!(outputs.contains(&("used_fallback", "false".to_string())));
}

#[test]
fn page_without_content_images_falls_back() {
    let dir = tempdir().unwrap();
    let source = StubSource::serving("<html><body><p>Nothing to see</p></body></html>");
    let mut rng = StdRng::seed_from_u64(5);
    let (items, origin) = collect_items(&settings(&dir.path().join("f.xml")), &source, today(), &mut rng).unwrap();
    assert_eq!(origin, Origin::Fallback);
    assert_eq!(items.len(), FALLBACK_LEN);
}

#[test]
fn write_failure_is_fatal() {
    let dir = tempdir().unwrap();
    // A regular file where the output directory should be.
    let blocker = dir.path().join("docs");
    fs::write(&blocker, "not a directory").unwrap();
    let source = StubSource::serving(FIXTURE);
    let mut rng = StdRng::seed_from_u64(1);

    let err = run(&settings(&blocker.join("feed.xml")), &source, now(), &mut rng).unwrap_err();
    assert!(matches!(err, FeedError::Io(_)));
}
