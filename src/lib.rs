//! cartoon2rss - turn the images of a cartoon archive page into an RSS feed.
//!
//! The pipeline fetches one page, picks out content images, infers a title,
//! description and date for each, and renders the result as RSS 2.0. When
//! the page cannot be fetched or holds nothing usable, a fixed fallback
//! dataset is published instead.

pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod feed;
pub mod fetch;
pub mod infer;
pub mod item;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod text;

pub use config::{Environment, Settings};
pub use error::{FeedError, Result};
pub use fetch::{FetchedPage, HttpFetcher, PageSource};
pub use item::ContentItem;
pub use pipeline::{run, Origin, RunReport};
