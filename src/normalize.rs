use std::collections::HashSet;

use crate::extract::canonical_key;
use crate::item::ContentItem;

/// Drop repeated URLs (first occurrence wins) and order newest first.
/// Items sharing a date keep their input order.
pub fn normalize(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    let mut items: Vec<ContentItem> = items
        .into_iter()
        .filter(|item| seen.insert(canonical_key(&item.url)))
        .collect();
    // `sort_by` is stable.
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use url::Url;

    fn item(path: &str, title: &str, date: (i32, u32, u32)) -> ContentItem {
        ContentItem::new(
            Url::parse("https://cartoons.example.org/").unwrap().join(path).unwrap(),
            title.to_string(),
            format!("About {}", title),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        )
    }

    #[test]
    fn first_duplicate_wins() {
        let out = normalize(vec![
            item("/uploads/a.jpg", "first", (2024, 1, 1)),
            item("/uploads/b.jpg", "other", (2024, 2, 1)),
            item("/uploads/a.jpg#again", "second", (2025, 1, 1)),
        ]);
        assert_eq!(out.len(), 2);
        let a = out.iter().find(|i| i.url.path() == "/uploads/a.jpg").unwrap();
        assert_eq!(a.title, "first");
    }

    #[test]
    fn newest_first_and_stable() {
        let out = normalize(vec![
            item("/uploads/old.jpg", "old", (2021, 5, 1)),
            item("/uploads/tie1.jpg", "tie1", (2024, 3, 3)),
            item("/uploads/new.jpg", "new", (2025, 1, 9)),
            item("/uploads/tie2.jpg", "tie2", (2024, 3, 3)),
        ]);
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "tie1", "tie2", "old"]);
        assert!(out.windows(2).all(|w| w[0].published_at >= w[1].published_at));
    }

    #[test]
    fn empty_input() {
        assert!(normalize(Vec::new()).is_empty());
    }
}
