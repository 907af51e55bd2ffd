//! Page retrieval through the sqlite response cache.
//!
//! Pages are fetched one at a time; the site is a small community project
//! and does not get hammered. Everything downstream only ever sees the
//! parsed tree.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::db;
use crate::dom::Dom;

const MAX_AGE_DAYS: i64 = 30;

pub struct PageCache<'a> {
    client: reqwest::Client,
    conn: &'a Connection,
    max_age_days: i64,
}

impl<'a> PageCache<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            client: reqwest::Client::new(),
            conn,
            max_age_days: MAX_AGE_DAYS,
        }
    }

    /// Fetch `url` as a parsed tree, via the cache.
    pub async fn fetch(&self, url: &str) -> Result<Dom> {
        if let Some(body) = db::cache_get(self.conn, url, self.max_age_days)? {
            debug!("cache hit: {}", url);
            return Ok(Dom::parse(&body));
        }

        debug!("cache miss: {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("GET {} returned {}", url, status);
        }
        let body = resp.text().await?;
        db::cache_put(self.conn, url, status.as_u16(), &body)?;
        Ok(Dom::parse(&body))
    }
}
