//! Run configuration.
//!
//! All environment-dependent behaviour is resolved here once, at startup,
//! into plain values. The pipeline only ever sees a [`Settings`].

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::Result;

/// Page scraped when `--url` is not given.
pub const DEFAULT_SOURCE_URL: &str = "https://cartoons.example.org/";

/// Default feed location, relative to the working directory.
pub const DEFAULT_OUTPUT: &str = "docs/feed.xml";

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

const DEFAULT_REPOSITORY: &str = "cartoon2rss/cartoon2rss";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Process environment captured once in `main`.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// `GITHUB_ACTIONS=true`.
    pub ci: bool,
    /// `GITHUB_REPOSITORY`, e.g. `owner/name`.
    pub repository: Option<String>,
    /// `PAGES_BASE_URL`.
    pub pages_base_url: Option<String>,
    /// `GITHUB_OUTPUT`, the file CI steps append output variables to.
    pub output_file: Option<PathBuf>,
}

impl Environment {
    pub fn capture() -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            ci: env::var("GITHUB_ACTIONS").map(|v| v == "true").unwrap_or(false),
            repository: non_empty("GITHUB_REPOSITORY"),
            pages_base_url: non_empty("PAGES_BASE_URL"),
            output_file: non_empty("GITHUB_OUTPUT").map(PathBuf::from),
        }
    }
}

/// Retry schedule for the page fetch: `base_delay * attempt` between tries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub user_agent: String,
    pub accept_language: String,
}

impl FetchConfig {
    pub fn new(repository_url: &str, timeout: Duration) -> Self {
        Self {
            timeout,
            retry: RetryPolicy::default(),
            user_agent: format!(
                "Mozilla/5.0 (compatible; Cartoon2RSS-Bot/{}; +{})",
                env!("CARGO_PKG_VERSION"),
                repository_url
            ),
            accept_language: ACCEPT_LANGUAGE.to_string(),
        }
    }
}

/// Channel-level feed metadata.
#[derive(Debug, Clone)]
pub struct ChannelMeta {
    pub title: String,
    /// The scraped page.
    pub link: String,
    pub description: String,
    pub language: String,
    /// Where the rendered feed will be served from.
    pub self_url: String,
    /// Site the feed is published on.
    pub home_url: String,
    pub repository_url: String,
    /// Used for the channel image when there are no items.
    pub favicon_url: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CiContext {
    pub enabled: bool,
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub source_url: Url,
    pub output_path: PathBuf,
    pub verbose: bool,
    pub fetch: FetchConfig,
    pub channel: ChannelMeta,
    pub ci: CiContext,
}

impl Settings {
    pub fn new(
        source_url: &str,
        output_path: PathBuf,
        verbose: bool,
        timeout: Duration,
        env: &Environment,
    ) -> Result<Self> {
        let source_url = Url::parse(source_url)?;
        let repository = env.repository.as_deref().unwrap_or(DEFAULT_REPOSITORY);
        let repository_url = format!("https://github.com/{}", repository);
        let home_url = env
            .pages_base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| pages_url_for(repository));
        let self_url = format!("{}/{}", home_url, feed_file_name(&output_path));
        let host = source_url.host_str().unwrap_or(source_url.as_str()).to_string();
        let favicon_url = source_url
            .join("/favicon.ico")
            .map(String::from)
            .unwrap_or_else(|_| source_url.to_string());

        let channel = ChannelMeta {
            title: format!("Cartoons from {}", host),
            link: source_url.to_string(),
            description: format!("The latest cartoons published on {}, refreshed daily.", host),
            language: "en".to_string(),
            self_url,
            home_url,
            favicon_url,
            categories: vec![
                "Cartoons".to_string(),
                "Comics".to_string(),
                "Humor".to_string(),
            ],
            repository_url: repository_url.clone(),
        };

        Ok(Self {
            source_url,
            output_path,
            verbose,
            fetch: FetchConfig::new(&repository_url, timeout),
            channel,
            ci: CiContext {
                enabled: env.ci,
                output_file: env.output_file.clone(),
            },
        })
    }
}

/// `owner/name` -> `https://owner.github.io/name`.
fn pages_url_for(repository: &str) -> String {
    match repository.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            format!("https://{}.github.io/{}", owner.to_lowercase(), name)
        }
        _ => format!("https://{}.github.io", repository.to_lowercase()),
    }
}

fn feed_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("feed.xml")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(env: &Environment) -> Settings {
        Settings::new(
            DEFAULT_SOURCE_URL,
            PathBuf::from(DEFAULT_OUTPUT),
            false,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            env,
        )
        .unwrap()
    }

    #[test]
    fn defaults_without_environment() {
        let s = settings(&Environment::default());
        assert_eq!(s.channel.repository_url, "https://github.com/cartoon2rss/cartoon2rss");
        assert_eq!(s.channel.home_url, "https://cartoon2rss.github.io/cartoon2rss");
        assert_eq!(s.channel.self_url, "https://cartoon2rss.github.io/cartoon2rss/feed.xml");
        assert_eq!(s.channel.favicon_url, "https://cartoons.example.org/favicon.ico");
        assert!(!s.ci.enabled);
        assert!(s.fetch.user_agent.contains("Cartoon2RSS-Bot"));
    }

    #[test]
    fn environment_overrides_links() {
        let env = Environment {
            ci: true,
            repository: Some("Inkwell/daily-strips".to_string()),
            pages_base_url: Some("https://strips.example.net/".to_string()),
            output_file: Some(PathBuf::from("/tmp/out")),
        };
        let s = settings(&env);
        assert_eq!(s.channel.repository_url, "https://github.com/Inkwell/daily-strips");
        assert_eq!(s.channel.self_url, "https://strips.example.net/feed.xml");
        assert!(s.ci.enabled);
        assert_eq!(s.ci.output_file.as_deref(), Some(Path::new("/tmp/out")));
    }

    #[test]
    fn pages_url_derived_from_repository() {
        assert_eq!(pages_url_for("Inkwell/strips"), "https://inkwell.github.io/strips");
        assert_eq!(pages_url_for("solo"), "https://solo.github.io");
    }

    #[test]
    fn linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4000));
    }
}
