//! Synthetic items published when the source cannot be scraped, so the
//! feed never goes empty.

use chrono::{Datelike, Months, NaiveDate};
use rand::Rng;
use url::Url;

use crate::error::Result;
use crate::item::ContentItem;
use crate::normalize::normalize;

struct FallbackEntry {
    title: &'static str,
    description: &'static str,
    filename: &'static str,
    months_ago: u32,
}

const FALLBACK_ENTRIES: &[FallbackEntry] = &[
    FallbackEntry {
        title: "Budget Season",
        description: "The finance minister balances the books on a very small unicycle.",
        filename: "budget-season.jpg",
        months_ago: 0,
    },
    FallbackEntry {
        title: "Traffic Report",
        description: "Commuters discover the new bypass leads straight back to the old one.",
        filename: "traffic-report.jpg",
        months_ago: 1,
    },
    FallbackEntry {
        title: "Heatwave Diplomacy",
        description: "World leaders agree on everything except who gets the air conditioning.",
        filename: "heatwave-diplomacy.jpg",
        months_ago: 2,
    },
    FallbackEntry {
        title: "Election Promises",
        description: "A candidate unveils a platform built entirely out of recycled slogans.",
        filename: "election-promises.jpg",
        months_ago: 3,
    },
    FallbackEntry {
        title: "Remote Work",
        description: "The office plant files a complaint about being left alone for months.",
        filename: "remote-work.jpg",
        months_ago: 5,
    },
    FallbackEntry {
        title: "Inflation Watch",
        description: "Shoppers weigh their groceries against their monthly rent payment.",
        filename: "inflation-watch.jpg",
        months_ago: 7,
    },
    FallbackEntry {
        title: "Smart City",
        description: "The new parking meters now accept payment in personal data only.",
        filename: "smart-city.jpg",
        months_ago: 9,
    },
    FallbackEntry {
        title: "Climate Summit",
        description: "Delegates fly in from every corner of the globe to discuss emissions.",
        filename: "climate-summit.jpg",
        months_ago: 12,
    },
];

/// Number of items [`generate`] always returns.
pub const FALLBACK_LEN: usize = FALLBACK_ENTRIES.len();

/// Build the fallback dataset relative to `today`, newest first.
///
/// Each entry lands `months_ago` months back on a random day between the
/// 1st and the 28th. URLs use the same `wp-content/uploads/YYYY/MM/` shape
/// as scraped images.
pub fn generate<R: Rng>(site: &Url, today: NaiveDate, rng: &mut R) -> Result<Vec<ContentItem>> {
    let items = FALLBACK_ENTRIES
        .iter()
        .map(|entry| -> Result<ContentItem> {
            let day = rng.gen_range(1..=28);
            let published_at = today
                .checked_sub_months(Months::new(entry.months_ago))
                .and_then(|d| d.with_day(day))
                .unwrap_or(today);
            let path = format!(
                "/wp-content/uploads/{:04}/{:02}/{}",
                published_at.year(),
                published_at.month(),
                entry.filename
            );
            let url = site.join(&path)?;
            Ok(ContentItem::new(
                url,
                entry.title.to_string(),
                entry.description.to_string(),
                published_at,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(normalize(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{is_denied, UPLOADS_MARKER};
    use crate::infer::date_from_url;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn site() -> Url {
        Url::parse("https://cartoons.example.org/").unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn fixed_cardinality_sorted_newest_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = generate(&site(), today(), &mut rng).unwrap();
        assert_eq!(items.len(), FALLBACK_LEN);
        assert_eq!(FALLBACK_LEN, 8);
        assert!(items.windows(2).all(|w| w[0].published_at >= w[1].published_at));
    }

    #[test]
    fn dates_are_plausible() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for item in generate(&site(), today(), &mut rng).unwrap() {
                let year = item.published_at.year();
                assert!((2000..=today().year() + 1).contains(&year));
                assert!((1..=28).contains(&item.published_at.day()));
            }
        }
    }

    #[test]
    fn urls_look_scraped() {
        let mut rng = StdRng::seed_from_u64(1);
        for item in generate(&site(), today(), &mut rng).unwrap() {
            assert!(item.url.as_str().contains(UPLOADS_MARKER));
            assert!(!is_denied(&item.url));
            // The URL encodes the item's year and month.
            let from_url = date_from_url(item.url.as_str(), today()).unwrap();
            assert_eq!(from_url.year(), item.published_at.year());
            assert_eq!(from_url.month(), item.published_at.month());
            assert_eq!(item.source_filename, item.url.path_segments().unwrap().last().unwrap());
        }
    }

    #[test]
    fn months_back_across_year_boundary() {
        let mut rng = StdRng::seed_from_u64(3);
        let jan = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let items = generate(&site(), jan, &mut rng).unwrap();
        let oldest = items.last().unwrap();
        assert_eq!((oldest.published_at.year(), oldest.published_at.month()), (2025, 1));
    }
}
