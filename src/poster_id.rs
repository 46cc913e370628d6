//! Pseudonymous poster-ID derivation
//!
//! On boards that show poster IDs, every post carries a short identifier
//! derived from the poster's address and the thread's random salt, so one
//! poster is recognizable within a thread without exposing the address.
//! The ID is a pure function of (secret, thread salt, IP); the moka cache
//! is only a shortcut and any caller may recompute instead.

use moka::sync::Cache;
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use std::time::Duration;

/// Hex characters of the derived ID exposed to readers.
const POSTER_ID_LEN: usize = 8;

/// Memoized IDs, keyed by (IP, thread). Entries expire on their own; the
/// cache holds nothing correctness depends on.
static POSTER_ID_CACHE: Lazy<Cache<(String, i32), String>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(3600))
        .max_capacity(100_000)
        .build()
});

/// Secret for ID derivation. Prefers the configured value; otherwise a
/// random one is generated, which makes IDs unstable across restarts.
static SITE_SECRET: Lazy<String> = Lazy::new(|| {
    let configured = crate::app_config::site().secret;
    if !configured.is_empty() {
        return configured;
    }

    let random_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    log::warn!(
        "ASHCAN_SITE_SECRET is not set. Poster IDs will change every time the application restarts. Need a key? How about:\r\n{}",
        random_string
    );
    random_string
});

/// Derive a poster ID from scratch. Pure given the site secret.
pub fn derive_poster_id(ip_address: &str, thread_salt: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(SITE_SECRET.as_bytes());
    hasher.update(thread_salt.as_bytes());
    hasher.update(ip_address.as_bytes());
    hasher.finalize().to_hex()[..POSTER_ID_LEN].to_string()
}

/// Memoized variant used on the posting path.
pub fn poster_id_for(ip_address: &str, thread_id: i32, thread_salt: &str) -> String {
    let cache_key = (ip_address.to_string(), thread_id);
    if let Some(cached) = POSTER_ID_CACHE.get(&cache_key) {
        return cached;
    }

    let id = derive_poster_id(ip_address, thread_salt);
    POSTER_ID_CACHE.insert(cache_key, id.clone());
    id
}

/// Drop cached IDs for one thread's poster, e.g. after a ban wipes their
/// posts.
pub fn invalidate_poster_id(ip_address: &str, thread_id: i32) {
    POSTER_ID_CACHE.invalidate(&(ip_address.to_string(), thread_id));
}
