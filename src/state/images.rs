use std::collections::{HashMap, HashSet};

use iced::widget::image::Handle;

use crate::error::Error;

/// Downloaded image bytes, keyed by URL.
///
/// The grid and the detail overlay both render remote assets; bytes
/// are fetched once per URL and kept as widget handles for the life of
/// the session. Failed URLs are remembered so a broken asset does not
/// refetch on every layout pass.
#[derive(Debug, Default)]
pub struct ImageCache {
    ready: HashMap<String, Handle>,
    pending: HashSet<String>,
    failed: HashSet<String>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&Handle> {
        self.ready.get(url)
    }

    /// Mark every unknown URL as pending and hand back the list to
    /// fetch. URLs already ready, pending, or failed are skipped.
    pub fn request<'a>(&mut self, urls: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut to_fetch = Vec::new();
        for url in urls {
            if self.ready.contains_key(url) || self.pending.contains(url) || self.failed.contains(url)
            {
                continue;
            }
            self.pending.insert(url.to_string());
            to_fetch.push(url.to_string());
        }
        to_fetch
    }

    pub fn fulfill(&mut self, url: String, result: Result<Vec<u8>, Error>) {
        self.pending.remove(&url);
        match result {
            Ok(bytes) => {
                self.ready.insert(url, Handle::from_bytes(bytes));
            }
            Err(err) => {
                log::warn!("could not load {url}: {err}");
                self.failed.insert(url);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_dedups_and_marks_pending() {
        let mut cache = ImageCache::new();
        let first = cache.request(["u1", "u2", "u1"]);
        assert_eq!(first, vec!["u1", "u2"]);

        // Pending URLs are not handed out twice.
        assert!(cache.request(["u1", "u2"]).is_empty());
    }

    #[test]
    fn fulfilled_urls_become_ready() {
        let mut cache = ImageCache::new();
        cache.request(["u1"]);
        cache.fulfill("u1".into(), Ok(vec![0, 1, 2, 3]));

        assert!(cache.get("u1").is_some());
        assert!(cache.request(["u1"]).is_empty());
    }

    #[test]
    fn failed_urls_are_not_refetched() {
        let mut cache = ImageCache::new();
        cache.request(["u1"]);
        cache.fulfill("u1".into(), Err(Error::Network("timeout".into())));

        assert!(cache.get("u1").is_none());
        assert!(cache.request(["u1"]).is_empty());
    }
}
