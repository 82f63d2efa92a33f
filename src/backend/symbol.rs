//! Token symbol resolution
//!
//! Resolution order: typed contract `symbol()` call, then a raw `eth_call`
//! with the same selector, then the token address itself. Successful
//! lookups are kept in an LRU cache with TTL; fallbacks are not cached so a
//! later scan can still pick up the real symbol.

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use std::future::Future;
use std::num::NonZeroUsize;

use crate::error::BackendResult;

const DEFAULT_CAPACITY: usize = 1000;
const DEFAULT_TTL_SECS: i64 = 6 * 3600;

#[derive(Clone)]
struct CacheEntry {
    symbol: String,
    cached_at: DateTime<Utc>,
}

/// LRU cache of resolved token symbols
pub struct SymbolCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl SymbolCache {
    /// Create a new symbol cache
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of tokens to cache
    /// * `ttl_seconds` - Time-to-live in seconds for each entry
    pub fn new(capacity: usize, ttl_seconds: i64) -> Self {
        let cap = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn get(&self, token: &str) -> Option<String> {
        let mut cache = self.cache.lock();

        if let Some(entry) = cache.get(token) {
            let age = Utc::now() - entry.cached_at;
            if age < self.ttl {
                return Some(entry.symbol.clone());
            }
            tracing::trace!(token = token, "Symbol cache entry expired");
            cache.pop(token);
        }

        None
    }

    pub fn insert(&self, token: &str, symbol: String) {
        let entry = CacheEntry {
            symbol,
            cached_at: Utc::now(),
        };
        self.cache.lock().put(token.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for SymbolCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL_SECS)
    }
}

/// Result of a symbol lookup, with the step that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSymbol {
    /// Typed contract call succeeded
    Direct(String),
    /// Raw selector call succeeded
    Raw(String),
    /// Both calls failed; the token address stands in
    Fallback(String),
}

impl ResolvedSymbol {
    pub fn into_inner(self) -> String {
        match self {
            Self::Direct(s) | Self::Raw(s) | Self::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Run the symbol fallback chain for `token`.
///
/// `direct` and `raw` are only polled in order; a failing or empty result
/// moves on to the next step. Never fails.
pub async fn resolve_symbol<D, R>(token: &str, direct: D, raw: R) -> ResolvedSymbol
where
    D: Future<Output = BackendResult<String>>,
    R: Future<Output = BackendResult<String>>,
{
    match direct.await {
        Ok(symbol) if !symbol.trim().is_empty() => {
            return ResolvedSymbol::Direct(symbol.trim().to_string())
        }
        Ok(_) => tracing::debug!(token = token, "Typed symbol() returned empty string"),
        Err(e) => tracing::debug!(token = token, error = %e, "Typed symbol() call failed"),
    }

    match raw.await {
        Ok(symbol) if !symbol.trim().is_empty() => {
            return ResolvedSymbol::Raw(symbol.trim().to_string())
        }
        Ok(_) => tracing::debug!(token = token, "Raw symbol() returned empty string"),
        Err(e) => tracing::debug!(token = token, error = %e, "Raw symbol() call failed"),
    }

    tracing::debug!(token = token, "Falling back to address as symbol");
    ResolvedSymbol::Fallback(token.to_string())
}

/// Cache-aware wrapper around [`resolve_symbol`]
pub async fn cached_symbol<D, R>(cache: &SymbolCache, token: &str, direct: D, raw: R) -> String
where
    D: Future<Output = BackendResult<String>>,
    R: Future<Output = BackendResult<String>>,
{
    if let Some(symbol) = cache.get(token) {
        return symbol;
    }

    let resolved = resolve_symbol(token, direct, raw).await;
    if resolved.is_fallback() {
        return resolved.into_inner();
    }

    let symbol = resolved.into_inner();
    cache.insert(token, symbol.clone());
    symbol
}
