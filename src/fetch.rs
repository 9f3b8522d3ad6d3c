//! Page fetching with bounded, linearly backed-off retries.

use std::thread::sleep;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use tracing::{info, warn};
use url::Url;

use crate::config::{FetchConfig, RetryPolicy};
use crate::error::{FeedError, Result};

/// A fetched page: the URL it was finally served from, after redirects,
/// and its raw bytes.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub body: Vec<u8>,
}

/// Something that can hand back the raw bytes of a page.
pub trait PageSource {
    fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// Blocking HTTP implementation of [`PageSource`].
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client, config })
    }

    fn get_once(&self, url: &Url) -> Result<FetchedPage> {
        let resp = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, &self.config.accept_language)
            .header(CONNECTION, "keep-alive")
            .send()?;

        if !resp.status().is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let final_url = resp.url().clone();
        Ok(FetchedPage {
            url: final_url,
            body: resp.bytes()?.to_vec(),
        })
    }
}

impl PageSource for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let page = with_retries(&self.config.retry, url, |_| self.get_once(url))?;
        if page.url != *url {
            info!(from = %url, to = %page.url, "followed redirect");
        }
        info!(url = %page.url, bytes = page.body.len(), "fetched page");
        Ok(page)
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is reached, sleeping
/// `policy.delay_after(attempt)` between attempts.
pub fn with_retries<T, F>(policy: &RetryPolicy, url: &Url, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        info!(%url, attempt, max_attempts, "fetching");
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(%url, attempt, error = %e, "fetch failed, retrying in {:?}", delay);
                sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                warn!(%url, attempt, error = %e, "fetch failed, no attempts left");
                return Err(FeedError::FetchExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
        }
    }
}
