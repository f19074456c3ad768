//! Offline cache shim: precache on install, serve cache-first, drop stale
//! caches on activation.
//!
//! Mirrors the site's service worker so the same behavior can run and be
//! tested outside a browser. [`service_worker_js`] renders the worker itself.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::try_join_all;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::RwLock;

use crate::config::CacheConfig;
use crate::error::{Error, Result};

/// A response as stored in a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl CachedResponse {
    /// A `200 OK` response with the given body.
    #[must_use]
    pub fn ok(content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Network access for the cache.
///
/// A response with an error status is still `Ok`; only transport failures
/// are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<CachedResponse>;
}

/// Fetches asset paths from an origin over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: String,
}

impl HttpFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, origin: impl Into<String>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        Self { client, origin }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<CachedResponse> {
        let url = format!("{}{path}", self.origin);
        log::debug!("network fetch {url}");
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.bytes().await?;
        Ok(CachedResponse {
            status,
            content_type,
            body,
        })
    }
}

type NamedCaches = BTreeMap<String, BTreeMap<String, CachedResponse>>;

/// Named caches plus the cache-first fetch strategy.
#[derive(Debug)]
pub struct OfflineCache<F> {
    fetcher: F,
    name: String,
    assets: Vec<String>,
    caches: RwLock<NamedCaches>,
}

impl<F: Fetcher> OfflineCache<F> {
    #[must_use]
    pub fn new(fetcher: F, config: &CacheConfig) -> Self {
        Self {
            fetcher,
            name: config.name.clone(),
            assets: config.assets.clone(),
            caches: RwLock::new(BTreeMap::new()),
        }
    }

    /// Name of the current cache.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetches every asset and stores them all in the current cache.
    ///
    /// Nothing is stored unless every asset arrives with a success status.
    ///
    /// # Errors
    ///
    /// Returns the first transport failure, or [`Error::Cache`] naming an
    /// asset that came back with an error status.
    pub async fn install(&self) -> Result<()> {
        let responses =
            try_join_all(self.assets.iter().map(|path| self.fetcher.fetch(path))).await?;

        if let Some((path, response)) = self
            .assets
            .iter()
            .zip(&responses)
            .find(|(_, r)| !r.is_success())
        {
            return Err(Error::Cache(format!(
                "precache of {path} returned status {}",
                response.status
            )));
        }

        let mut caches = self.caches.write().await;
        let cache = caches.entry(self.name.clone()).or_default();
        for (path, response) in self.assets.iter().zip(responses) {
            cache.insert(path.clone(), response);
        }
        log::info!("installed {} assets into {}", self.assets.len(), self.name);
        Ok(())
    }

    /// Looks `path` up in every cache, oldest name first.
    pub async fn lookup(&self, path: &str) -> Option<CachedResponse> {
        self.caches
            .read()
            .await
            .values()
            .find_map(|cache| cache.get(path).cloned())
    }

    /// Stores a response under `path` in the named cache, creating it if needed.
    pub async fn put(&self, cache_name: &str, path: &str, response: CachedResponse) {
        self.caches
            .write()
            .await
            .entry(cache_name.to_string())
            .or_default()
            .insert(path.to_string(), response);
    }

    /// Serves `path` from the cache, or from the network while keeping a copy.
    ///
    /// If that fails, one plain network fetch is attempted.
    ///
    /// # Errors
    ///
    /// Returns the error of the fallback network fetch.
    pub async fn fetch(&self, path: &str) -> Result<CachedResponse> {
        match self.cache_first(path).await {
            Ok(response) => Ok(response),
            Err(e) => {
                log::debug!("cache-first fetch of {path} failed, retrying network: {e}");
                self.fetcher.fetch(path).await
            }
        }
    }

    async fn cache_first(&self, path: &str) -> Result<CachedResponse> {
        if let Some(cached) = self.lookup(path).await {
            log::debug!("cache hit {path}");
            return Ok(cached);
        }
        let response = self.fetcher.fetch(path).await?;
        self.put(&self.name, path, response.clone()).await;
        Ok(response)
    }

    /// Deletes every cache not named like the current one and returns the
    /// deleted names.
    pub async fn activate(&self) -> Vec<String> {
        let mut caches = self.caches.write().await;
        let stale: Vec<String> = caches
            .keys()
            .filter(|name| **name != self.name)
            .cloned()
            .collect();
        for name in &stale {
            caches.remove(name);
            log::info!("deleted stale cache {name}");
        }
        stale
    }

    /// Names of the existing caches.
    pub async fn cache_names(&self) -> Vec<String> {
        self.caches.read().await.keys().cloned().collect()
    }
}

/// Renders the browser service worker for `config`.
///
/// # Errors
///
/// Returns an error if the cache name or asset list cannot be encoded.
pub fn service_worker_js(config: &CacheConfig) -> Result<String> {
    let name = serde_json::to_string(&config.name)?;
    let assets = serde_json::to_string(&config.assets)?;
    Ok(format!(
        r"const CACHE_NAME = {name};
const ASSETS = {assets};

self.addEventListener('install', event => {{
  event.waitUntil(
    caches.open(CACHE_NAME).then(cache => cache.addAll(ASSETS))
  );
}});

self.addEventListener('fetch', event => {{
  event.respondWith(
    caches.match(event.request).then(resp => {{
      return resp || fetch(event.request).then(fetchResp => {{
        return caches.open(CACHE_NAME).then(cache => {{ cache.put(event.request, fetchResp.clone()); return fetchResp; }});
      }});
    }}).catch(() => fetch(event.request))
  );
}});

self.addEventListener('activate', event => {{
  event.waitUntil(
    caches.keys().then(keys => Promise.all(keys.map(k => {{ if (k !== CACHE_NAME) return caches.delete(k); }})))
  );
}});
"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A fetcher serving canned responses and counting calls per path.
    struct MockFetcher {
        responses: HashMap<String, CachedResponse>,
        calls: Mutex<HashMap<String, usize>>,
        fail_first: Mutex<usize>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(HashMap::new()),
                fail_first: Mutex::new(0),
            }
        }

        fn with(mut self, path: &str, response: CachedResponse) -> Self {
            self.responses.insert(path.to_string(), response);
            self
        }

        fn failing_first(self, n: usize) -> Self {
            *self.fail_first.lock().unwrap() = n;
            self
        }

        fn calls(&self, path: &str) -> usize {
            self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, path: &str) -> Result<CachedResponse> {
            *self.calls.lock().unwrap().entry(path.to_string()).or_default() += 1;
            {
                let mut fail = self.fail_first.lock().unwrap();
                if *fail > 0 {
                    *fail -= 1;
                    return Err(Error::Cache("network down".to_string()));
                }
            }
            Ok(self.responses.get(path).cloned().unwrap_or(CachedResponse {
                status: 404,
                content_type: None,
                body: Bytes::new(),
            }))
        }
    }

    fn config(assets: &[&str]) -> CacheConfig {
        CacheConfig {
            name: "site-cache-v1".to_string(),
            assets: assets.iter().map(ToString::to_string).collect(),
            origin: None,
        }
    }

    fn page(body: &'static str) -> CachedResponse {
        CachedResponse::ok("text/html", body)
    }

    #[tokio::test]
    async fn install_precaches_all_assets() {
        let fetcher = MockFetcher::new()
            .with("/", page("home"))
            .with("/index.html", page("index"));
        let cache = OfflineCache::new(fetcher, &config(&["/", "/index.html"]));

        cache.install().await.unwrap();

        assert_eq!(cache.cache_names().await, vec!["site-cache-v1"]);
        assert_eq!(cache.lookup("/index.html").await, Some(page("index")));
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let fetcher = MockFetcher::new().with("/", page("home"));
        let cache = OfflineCache::new(fetcher, &config(&["/", "/missing.js"]));

        let err = cache.install().await.unwrap_err();

        assert!(matches!(err, Error::Cache(ref msg) if msg.contains("/missing.js")));
        assert!(cache.lookup("/").await.is_none());
        assert!(cache.cache_names().await.is_empty());
    }

    #[tokio::test]
    async fn install_fails_on_transport_error() {
        let fetcher = MockFetcher::new().with("/", page("home")).failing_first(1);
        let cache = OfflineCache::new(fetcher, &config(&["/"]));
        assert!(cache.install().await.is_err());
    }

    #[tokio::test]
    async fn fetch_serves_cached_without_network() {
        let fetcher = MockFetcher::new().with("/", page("home"));
        let cache = OfflineCache::new(fetcher, &config(&["/"]));
        cache.install().await.unwrap();

        let response = cache.fetch("/").await.unwrap();

        assert_eq!(response, page("home"));
        assert_eq!(cache.fetcher.calls("/"), 1);
    }

    #[tokio::test]
    async fn fetch_miss_goes_to_network_and_populates_cache() {
        let fetcher = MockFetcher::new().with("/about.html", page("about"));
        let cache = OfflineCache::new(fetcher, &config(&[]));

        assert_eq!(cache.fetch("/about.html").await.unwrap(), page("about"));
        assert_eq!(cache.fetch("/about.html").await.unwrap(), page("about"));

        assert_eq!(cache.fetcher.calls("/about.html"), 1);
        assert_eq!(cache.lookup("/about.html").await, Some(page("about")));
    }

    #[tokio::test]
    async fn fetch_caches_error_responses_too() {
        let cache = OfflineCache::new(MockFetcher::new(), &config(&[]));
        let response = cache.fetch("/nope").await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(cache.lookup("/nope").await.map(|r| r.status), Some(404));
    }

    #[tokio::test]
    async fn fetch_retries_network_once_after_failure() {
        let fetcher = MockFetcher::new()
            .with("/late.js", CachedResponse::ok("text/javascript", "late"))
            .failing_first(1);
        let cache = OfflineCache::new(fetcher, &config(&[]));

        let response = cache.fetch("/late.js").await.unwrap();

        assert_eq!(response.body, Bytes::from_static(b"late"));
        assert_eq!(cache.fetcher.calls("/late.js"), 2);
        assert!(cache.lookup("/late.js").await.is_none());
    }

    #[tokio::test]
    async fn fetch_errors_when_network_stays_down() {
        let fetcher = MockFetcher::new().failing_first(2);
        let cache = OfflineCache::new(fetcher, &config(&[]));
        assert!(cache.fetch("/").await.is_err());
    }

    #[tokio::test]
    async fn old_caches_still_match_before_activation() {
        let cache = OfflineCache::new(MockFetcher::new(), &config(&[]));
        cache.put("site-cache-v0", "/old.css", page("old")).await;

        assert_eq!(cache.fetch("/old.css").await.unwrap(), page("old"));
        assert_eq!(cache.fetcher.calls("/old.css"), 0);
    }

    #[tokio::test]
    async fn activate_deletes_other_caches() {
        let fetcher = MockFetcher::new().with("/", page("home"));
        let cache = OfflineCache::new(fetcher, &config(&["/"]));
        cache.put("site-cache-v0", "/old.css", page("old")).await;
        cache.put("another", "/x", page("x")).await;
        cache.install().await.unwrap();

        let deleted = cache.activate().await;

        assert_eq!(deleted, vec!["another", "site-cache-v0"]);
        assert_eq!(cache.cache_names().await, vec!["site-cache-v1"]);
        assert!(cache.lookup("/old.css").await.is_none());
    }

    #[tokio::test]
    async fn http_fetcher_reads_status_type_and_body() {
        use axum::Router;
        use axum::routing::get;

        let app = Router::new().route(
            "/manifest.json",
            get(|| async { ([(CONTENT_TYPE, "application/json")], "{}") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let fetcher = HttpFetcher::new(reqwest::Client::new(), format!("http://{addr}/"));
        let ok = fetcher.fetch("/manifest.json").await.unwrap();
        assert_eq!(ok.status, 200);
        assert_eq!(ok.content_type.as_deref(), Some("application/json"));
        assert_eq!(ok.body, Bytes::from_static(b"{}"));

        let missing = fetcher.fetch("/nope").await.unwrap();
        assert_eq!(missing.status, 404);
    }

    #[test]
    fn service_worker_embeds_name_and_assets() {
        let js = service_worker_js(&CacheConfig::default()).unwrap();
        assert!(js.starts_with("const CACHE_NAME = \"site-cache-v1\";"));
        assert!(js.contains(
            r#"const ASSETS = ["/","/index.html","/assets/og-image.svg","/manifest.json","/js/main.js"];"#
        ));
        assert!(js.contains("self.addEventListener('activate'"));
        assert!(!js.contains("{{"));
    }
}
