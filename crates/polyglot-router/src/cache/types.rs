//! Core data types for translation caching.

use polyglot_abstraction::{TranslationRequest, TranslationResult, normalize_language_tag};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{Duration, Instant};

/// Cache key for a translation.
///
/// A SHA-256 digest over the normalised (source, target, text) triple.
/// Language tags are normalised like request tags. The text is trimmed and
/// runs of whitespace collapse to one space; letter case is preserved because
/// it can change meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a text and language pair.
    pub fn derive(text: &str, source_lang: &str, target_lang: &str) -> Self {
        let text = normalize_text(text);
        let mut hasher = Sha256::new();
        hasher.update(normalize_language_tag(source_lang).as_bytes());
        hasher.update([0x1f]);
        hasher.update(normalize_language_tag(target_lang).as_bytes());
        hasher.update([0x1f]);
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Derives the key for a request.
    pub fn for_request(request: &TranslationRequest) -> Self {
        Self::derive(request.text(), request.source_lang(), request.target_lang())
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough to correlate log lines.
        f.write_str(&self.0[..self.0.len().min(12)])
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A cached translation with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached result. Cloned out on every hit.
    pub result: TranslationResult,
    /// When the entry was inserted or last refreshed.
    pub inserted_at: Instant,
    /// Logical clock value of the last access.
    pub last_accessed: u64,
    /// Logical clock value of the insertion, breaks LRU ties.
    pub inserted_seq: u64,
    /// Number of hits served.
    pub access_count: u64,
    /// Lifetime measured from `inserted_at`.
    pub ttl: Duration,
}

impl CacheEntry {
    /// Whether the entry has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }

    /// TTL left, zero once expired.
    pub fn remaining_ttl(&self) -> Duration {
        self.ttl.saturating_sub(self.inserted_at.elapsed())
    }
}

/// Cache statistics for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries removed to make room.
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: u64,
    /// Current number of entries.
    pub size: usize,
    /// Maximum number of entries.
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0 when there were none.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_deterministic() {
        let a = CacheKey::derive("hola mundo", "es", "en");
        let b = CacheKey::derive("hola mundo", "es", "en");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_cache_key_normalizes_whitespace_and_tags() {
        let a = CacheKey::derive("  hola   mundo\n", "ES", "en_US");
        let b = CacheKey::derive("hola mundo", "es", "en-us");
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_preserves_case_and_direction() {
        assert_ne!(CacheKey::derive("Hola", "es", "en"), CacheKey::derive("hola", "es", "en"));
        assert_ne!(CacheKey::derive("hola", "es", "en"), CacheKey::derive("hola", "en", "es"));
    }

    #[test]
    fn test_cache_key_separator_prevents_ambiguity() {
        assert_ne!(CacheKey::derive("b", "a", "xc"), CacheKey::derive("b", "ax", "c"));
    }

    #[test]
    fn test_cache_key_matches_request() {
        let request = TranslationRequest::new(" hola ", "ES", "EN").unwrap();
        assert_eq!(CacheKey::for_request(&request), CacheKey::derive("hola", "es", "en"));
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats { hits: 3, misses: 1, ..CacheStats::default() };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
