//! HTTP response cache shared by transport handles.
//!
//! Chromium mapping: net/http/http_cache.h (simplified in-memory version)
//!
//! Every handle built by one factory reads and writes the same cache, so a
//! response stored by one handle can satisfy a request on another.
//! Provides:
//! - Cache-Control header parsing (max-age, no-store, no-cache)
//! - ETag/If-None-Match and Last-Modified/If-Modified-Since validators
//! - Thread-safe concurrent access

use bytes::Bytes;
use dashmap::DashMap;
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use url::Url;

/// Cache key: URL without fragment plus method.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    url: String,
    method: Method,
}

impl CacheKey {
    pub fn new(url: &Url, method: &Method) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { url: url.into(), method: method.clone() }
    }
}

/// Cached response entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// When this entry was stored or last revalidated
    pub cached_at: Instant,
    /// Time-to-live from max-age
    pub ttl: Option<Duration>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl CacheEntry {
    /// Check if the entry is still fresh.
    pub fn is_fresh(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.cached_at.elapsed() < ttl,
            None => false,
        }
    }

    /// Whether the entry carries a validator for a conditional request.
    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }

    /// Rebuild a response from the entry.
    pub fn to_response(&self) -> Response<Bytes> {
        let mut response = Response::new(self.body.clone());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }
}

/// Only GET and HEAD responses are cached.
pub fn is_cacheable_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// In-memory HTTP cache.
///
/// Enforces entry count and byte size limits with simple eviction.
#[derive(Debug)]
pub struct HttpCache {
    entries: DashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    current_size: AtomicUsize,
    max_size_bytes: usize,
}

impl Default for HttpCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCache {
    /// Create a new cache with default limits.
    pub fn new() -> Self {
        Self::with_limits(1000, 50 * 1024 * 1024)
    }

    /// Create a cache with custom limits.
    pub fn with_limits(max_entries: usize, max_size_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            current_size: AtomicUsize::new(0),
            max_size_bytes,
        }
    }

    /// Look up a fresh cached response.
    pub fn get(&self, url: &Url, method: &Method) -> Option<CacheEntry> {
        self.get_any(url, method).filter(CacheEntry::is_fresh)
    }

    /// Look up a cached response regardless of freshness.
    pub fn get_any(&self, url: &Url, method: &Method) -> Option<CacheEntry> {
        if !is_cacheable_method(method) {
            return None;
        }
        self.entries.get(&CacheKey::new(url, method)).map(|e| e.value().clone())
    }

    /// Store a response in the cache.
    ///
    /// Parses Cache-Control headers to determine cacheability. Entries are
    /// keyed on URL and method only, so responses that vary on request
    /// headers are not stored. Neither is a body larger than the byte limit.
    pub fn store(&self, url: &Url, method: &Method, response: &Response<Bytes>) {
        if !is_cacheable_method(method) || !response.status().is_success() {
            return;
        }

        let cache_control = parse_cache_control(response.headers());
        if cache_control.no_store {
            return;
        }

        if response.headers().contains_key(http::header::VARY)
            || response.body().len() > self.max_size_bytes
        {
            tracing::trace!(url = %url, size = response.body().len(), "response not cacheable");
            self.remove(url, method);
            return;
        }

        let etag = header_string(response.headers(), http::header::ETAG);
        let last_modified = header_string(response.headers(), http::header::LAST_MODIFIED);

        // no-cache keeps the entry for revalidation only
        let ttl = if cache_control.no_cache {
            None
        } else {
            cache_control.max_age.map(Duration::from_secs)
        };
        if ttl.is_none() && etag.is_none() && last_modified.is_none() {
            return;
        }

        let body = response.body().clone();
        let entry = CacheEntry {
            status: response.status(),
            headers: response.headers().clone(),
            body,
            cached_at: Instant::now(),
            ttl,
            etag,
            last_modified,
        };

        let key = CacheKey::new(url, method);
        self.remove_by_key(&key);
        self.maybe_evict(entry.body.len());

        tracing::trace!(url = %url, size = entry.body.len(), "caching response");
        self.current_size.fetch_add(entry.body.len(), Ordering::Relaxed);
        self.entries.insert(key, entry);
    }

    /// Refresh an entry from a 304 Not Modified response and return it.
    pub fn update_from_not_modified<B>(
        &self,
        url: &Url,
        method: &Method,
        response: &Response<B>,
    ) -> Option<CacheEntry> {
        let key = CacheKey::new(url, method);
        let mut entry = self.entries.get_mut(&key)?;

        for (name, value) in response.headers() {
            if name == http::header::CACHE_CONTROL
                || name == http::header::ETAG
                || name == http::header::EXPIRES
                || name == http::header::DATE
                || name == http::header::LAST_MODIFIED
            {
                entry.headers.insert(name.clone(), value.clone());
            }
        }

        let cache_control = parse_cache_control(response.headers());
        if let Some(max_age) = cache_control.max_age {
            entry.ttl = Some(Duration::from_secs(max_age));
        }
        entry.cached_at = Instant::now();

        if let Some(etag) = header_string(response.headers(), http::header::ETAG) {
            entry.etag = Some(etag);
        }
        let last_modified = header_string(response.headers(), http::header::LAST_MODIFIED);
        if let Some(last_modified) = last_modified {
            entry.last_modified = Some(last_modified);
        }

        Some(entry.value().clone())
    }

    /// Validator headers for a conditional request, if an entry exists.
    pub fn conditional_headers(&self, url: &Url, method: &Method) -> Option<HeaderMap> {
        let entry = self.get_any(url, method)?;

        let mut headers = HeaderMap::new();
        if let Some(value) = entry.etag.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(http::header::IF_NONE_MATCH, value);
        }
        if let Some(value) =
            entry.last_modified.as_deref().and_then(|v| HeaderValue::from_str(v).ok())
        {
            headers.insert(http::header::IF_MODIFIED_SINCE, value);
        }

        if headers.is_empty() {
            None
        } else {
            Some(headers)
        }
    }

    /// Remove an entry from the cache.
    pub fn remove(&self, url: &Url, method: &Method) {
        self.remove_by_key(&CacheKey::new(url, method));
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        self.entries.clear();
        self.current_size.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get current cache size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.current_size.load(Ordering::Relaxed)
    }

    fn maybe_evict(&self, new_entry_size: usize) {
        while self.entries.len() >= self.max_entries {
            if !self.evict_one() {
                break;
            }
        }

        while self.current_size.load(Ordering::Relaxed) + new_entry_size > self.max_size_bytes {
            if !self.evict_one() {
                break;
            }
        }
    }

    /// Evict the oldest entry. Returns false if the cache is empty.
    fn evict_one(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().cached_at)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(key) => {
                self.remove_by_key(&key);
                true
            }
            None => false,
        }
    }

    fn remove_by_key(&self, key: &CacheKey) {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.current_size.fetch_sub(entry.body.len(), Ordering::Relaxed);
        }
    }
}

fn header_string(headers: &HeaderMap, name: http::header::HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Parsed Cache-Control directive.
#[derive(Debug, Default)]
struct CacheControl {
    no_store: bool,
    no_cache: bool,
    max_age: Option<u64>,
}

fn parse_cache_control(headers: &HeaderMap) -> CacheControl {
    let mut cc = CacheControl::default();

    let Some(value) = headers.get(http::header::CACHE_CONTROL).and_then(|v| v.to_str().ok())
    else {
        return cc;
    };

    for directive in value.split(',') {
        let directive = directive.trim().to_ascii_lowercase();

        if directive == "no-store" {
            cc.no_store = true;
        } else if directive == "no-cache" {
            cc.no_cache = true;
        } else if let Some(age) = directive.strip_prefix("max-age=") {
            cc.max_age = age.trim_matches('"').parse::<u64>().ok();
        }
    }

    cc
}
