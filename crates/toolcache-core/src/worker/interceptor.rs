//! Fetch interception: cache-first with network fallback.
//!
//! Cached entries never expire and are never revalidated. They disappear only
//! when a newer version activates and deletes the partition.

use super::routing::{Route, RoutePolicy};
use crate::cache::CacheStore;
use crate::config::{PartitionRole, WorkerConfig};
use crate::error::{Result, ToolcacheError};
use crate::network::{Fetcher, Request, RequestKey, Response};
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies the routing policy to page requests for one worker version.
pub struct FetchInterceptor {
    config: Arc<WorkerConfig>,
    policy: RoutePolicy,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl FetchInterceptor {
    pub fn new(
        config: Arc<WorkerConfig>,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let policy = RoutePolicy::new(&config)?;
        Ok(Self {
            config,
            policy,
            store,
            fetcher,
        })
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Handle a page request.
    ///
    /// Returns `Ok(None)` when the request is not intercepted and the host
    /// should fetch it itself. An `Err` is a failed request as seen by the page.
    pub async fn handle(&self, request: &Request) -> Result<Option<Response>> {
        match self.policy.route(request) {
            Route::Passthrough(reason) => {
                debug!("Not intercepting {} ({:?})", request.url(), reason);
                Ok(None)
            }
            Route::NetworkOnly => self.fetch_network(request).await.map(Some),
            Route::CacheFirst => self.cache_first(request).await.map(Some),
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<Response> {
        let key = request.key();

        if let Some(cached) = self.lookup(&key) {
            debug!("Cache hit: {}", key);
            return Ok(cached);
        }

        match self.fetch_network(request).await {
            Ok(response) if response.is_cacheable() => {
                let (response, copy) = response.duplicate();
                let role = self.policy.classify(request.url());
                let partition = self.config.partition_name(role);
                if let Err(e) = self.store.put(&partition, &key, copy) {
                    warn!("Failed to cache {} in {}: {}", key, partition, e);
                }
                Ok(response)
            }
            Ok(response) => {
                debug!("Not caching {} (status {})", key, response.status());
                Ok(response)
            }
            Err(e) if e.is_network_failure() => self.offline_fallback(request, &key, e),
            Err(e) => Err(e),
        }
    }

    fn offline_fallback(
        &self,
        request: &Request,
        key: &RequestKey,
        error: ToolcacheError,
    ) -> Result<Response> {
        if request.is_navigation() {
            let offline_key = RequestKey::get(&self.config.offline_url()?);
            return match self.lookup(&offline_key) {
                Some(page) => {
                    debug!("Serving offline page for {}", key);
                    Ok(page)
                }
                None => {
                    warn!("Offline page not cached; navigation to {} fails", key);
                    Err(error)
                }
            };
        }

        self.lookup(key).ok_or(error)
    }

    async fn fetch_network(&self, request: &Request) -> Result<Response> {
        match self.config.fetch_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, self.fetcher.fetch(request))
                .await
                .map_err(|_| ToolcacheError::Timeout(timeout))?,
            None => self.fetcher.fetch(request).await,
        }
    }

    /// Look the key up in the current static partition, then the dynamic one.
    ///
    /// Store errors are logged and treated as a miss.
    fn lookup(&self, key: &RequestKey) -> Option<Response> {
        [PartitionRole::Static, PartitionRole::Dynamic]
            .into_iter()
            .find_map(|role| {
                let partition = self.config.partition_name(role);
                self.store.get(&partition, key).unwrap_or_else(|e| {
                    warn!("Cache lookup in {} failed for {}: {}", partition, key, e);
                    None
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::network::Method;
    use crate::testing::{HangingFetcher, StubFetcher};
    use bytes::Bytes;
    use url::Url;

    const ORIGIN: &str = "https://tools.example";

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    fn setup(fetcher: StubFetcher) -> (Arc<MemoryCacheStore>, Arc<StubFetcher>, FetchInterceptor) {
        let config = Arc::new(WorkerConfig::new(Url::parse(ORIGIN).unwrap(), "v1"));
        let store = Arc::new(MemoryCacheStore::new());
        let fetcher = Arc::new(fetcher);
        let interceptor =
            FetchInterceptor::new(config, store.clone(), fetcher.clone()).unwrap();
        (store, fetcher, interceptor)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let (store, fetcher, interceptor) = setup(StubFetcher::new());
        store
            .put("static-v1", &RequestKey::get(&url("/hub")), Response::ok("cached hub"))
            .unwrap();

        let response = interceptor
            .handle(&Request::get(url("/hub")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.into_body(), Bytes::from("cached hub"));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_caches_into_classified_partition() {
        let fetcher = StubFetcher::new()
            .serve(url("/about").as_str(), 200, "about")
            .serve(url("/styles/site.css").as_str(), 200, "body{}");
        let (store, _fetcher, interceptor) = setup(fetcher);

        interceptor.handle(&Request::get(url("/about"))).await.unwrap();
        interceptor
            .handle(&Request::get(url("/styles/site.css")))
            .await
            .unwrap();

        assert!(store.has("static-v1", &RequestKey::get(&url("/about"))).unwrap());
        assert!(store
            .has("dynamic-v1", &RequestKey::get(&url("/styles/site.css")))
            .unwrap());
        assert!(!store
            .has("static-v1", &RequestKey::get(&url("/styles/site.css")))
            .unwrap());
    }

    #[tokio::test]
    async fn test_non_200_returned_but_not_cached() {
        let fetcher = StubFetcher::new().serve(url("/broken").as_str(), 500, "oops");
        let (store, _fetcher, interceptor) = setup(fetcher);

        let response = interceptor
            .handle(&Request::get(url("/broken")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.status(), 500);
        assert!(store.partition_names().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_passthrough_and_network_only_never_write() {
        let fetcher = StubFetcher::new().serve(url("/api/convert").as_str(), 200, "{}");
        let (store, fetcher, interceptor) = setup(fetcher);

        let post = Request::new(Method::POST, url("/tools/pdf-merge"));
        assert!(interceptor.handle(&post).await.unwrap().is_none());

        let cross = Request::get(Url::parse("https://cdn.example/lib.js").unwrap());
        assert!(interceptor.handle(&cross).await.unwrap().is_none());

        let api = interceptor
            .handle(&Request::get(url("/api/convert")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(api.status(), 200);

        assert_eq!(fetcher.calls(), 1);
        assert!(store.partition_names().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_offline_page() {
        let (store, fetcher, interceptor) = setup(StubFetcher::new());
        store
            .put("static-v1", &RequestKey::get(&url("/offline")), Response::ok("offline"))
            .unwrap();
        fetcher.set_offline(true);

        let response = interceptor
            .handle(&Request::navigate(url("/tools/never-visited")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.into_body(), Bytes::from("offline"));
    }

    #[tokio::test]
    async fn test_offline_subresource_miss_propagates() {
        let (_store, fetcher, interceptor) = setup(StubFetcher::new());
        fetcher.set_offline(true);

        let result = interceptor.handle(&Request::get(url("/img/logo.png"))).await;
        assert!(matches!(result, Err(ToolcacheError::Network { .. })));
    }

    #[tokio::test]
    async fn test_offline_navigation_without_offline_page_fails() {
        let (_store, fetcher, interceptor) = setup(StubFetcher::new());
        fetcher.set_offline(true);

        let result = interceptor.handle(&Request::navigate(url("/hub"))).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_fetch_timeout() {
        let mut config = WorkerConfig::new(Url::parse(ORIGIN).unwrap(), "v1");
        config.fetch_timeout_secs = Some(5);
        let interceptor = FetchInterceptor::new(
            Arc::new(config),
            Arc::new(MemoryCacheStore::new()),
            Arc::new(HangingFetcher),
        )
        .unwrap();

        let result = interceptor.handle(&Request::get(url("/slow"))).await;
        assert!(matches!(result, Err(ToolcacheError::Timeout(_))));
    }
}
