//! Page and resource retrieval. Every transport fault becomes an absent value;
//! nothing here may panic across the stage boundary.

use log::debug;
use std::time::Duration;
use url::Url;

use crate::utils::config::HttpConsts;

/// Source of page text and resource bytes. The crawl stages call through this
/// seam, so tests substitute a canned implementation and no stage ever owns a
/// network client of its own.
pub trait PageSource: Send + Sync {
    /// Retrieve a page as text. `None` on any transport or status failure.
    fn load(&self, page: &str) -> Option<String>;

    /// Retrieve raw resource bytes. Same fault-to-absent contract as `load`.
    fn fetch(&self, url: &Url) -> Option<Vec<u8>>;
}

/// [`PageSource`] over a blocking reqwest client, built once and shared by the
/// load and fetch stages.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(HttpConsts::USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpFetcher {
    fn load(&self, page: &str) -> Option<String> {
        match self
            .client
            .get(page)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
        {
            Ok(text) => Some(text),
            Err(err) => {
                debug!("load {}: {}", page, err);
                None
            }
        }
    }

    fn fetch(&self, url: &Url) -> Option<Vec<u8>> {
        match self
            .client
            .get(url.as_str())
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
        {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(err) => {
                debug!("fetch {}: {}", url, err);
                None
            }
        }
    }
}
