//! Translation caching.
//!
//! Results are cached under a digest of the normalised text and language
//! pair, so repeated requests do not pay for a second provider call.

pub mod config;
pub mod store;
pub mod types;

pub use config::CacheConfig;
pub use store::{CacheError, TranslationCache};
pub use types::{CacheEntry, CacheKey, CacheStats};
