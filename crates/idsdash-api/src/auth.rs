// Bearer token lifecycle and the client-side key/value persistence seam.
//
// The token and its absolute expiry are kept as two plain string entries
// in a `KeyValueStore`, next to the optional API base override and UI
// theme preference. `TokenStore` is the only writer of the token entries.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

// ── Persisted keys ───────────────────────────────────────────────────

pub const TOKEN_KEY: &str = "ids_token";
pub const TOKEN_EXPIRY_KEY: &str = "ids_token_exp";
pub const API_BASE_KEY: &str = "ids_api_base";
pub const THEME_KEY: &str = "ids_theme";

/// Epoch values above this are milliseconds, below it seconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

// ── KeyValueStore ────────────────────────────────────────────────────

/// Plain string key/value storage for client-side state.
///
/// Implementations must be cheap to call on every request: the token is
/// read before each one.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-local [`KeyValueStore`]; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

// ── AuthMode ─────────────────────────────────────────────────────────

/// Which credential a request will carry.
///
/// Marker enum (no data) -- useful for branching without touching the
/// secret itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// A non-expired bearer token is held.
    Bearer,
    /// No usable token; the session cookie (if any) authenticates.
    Cookie,
}

// ── TokenStore ───────────────────────────────────────────────────────

/// Owner of the bearer token and its absolute expiry.
///
/// Cheaply cloneable; clones share the same backing store. A token past
/// its expiry is never returned and is purged by the read that notices.
#[derive(Clone, Debug)]
pub struct TokenStore {
    kv: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// A token store backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The backing key/value store (shared with other client-side state).
    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Store a token valid until `expires_at`.
    pub fn store(&self, token: &SecretString, expires_at: DateTime<Utc>) {
        debug!(expires_at = %expires_at, "storing bearer token");
        self.kv.set(TOKEN_KEY, token.expose_secret());
        self.kv
            .set(TOKEN_EXPIRY_KEY, &expires_at.timestamp_millis().to_string());
    }

    /// Store a token the backend issued without any expiry. It is
    /// presented until the backend answers 401.
    pub fn store_without_expiry(&self, token: &SecretString) {
        debug!("storing bearer token without expiry");
        self.kv.set(TOKEN_KEY, token.expose_secret());
        self.kv.remove(TOKEN_EXPIRY_KEY);
    }

    /// The current token, if one is held and not expired.
    pub fn current(&self) -> Option<SecretString> {
        self.current_at(Utc::now())
    }

    /// [`current`](Self::current) evaluated at an explicit instant.
    pub fn current_at(&self, now: DateTime<Utc>) -> Option<SecretString> {
        let token = self.kv.get(TOKEN_KEY)?;
        if token.is_empty() {
            self.clear();
            return None;
        }
        let Some(raw) = self.kv.get(TOKEN_EXPIRY_KEY) else {
            return Some(SecretString::from(token));
        };

        match raw.trim().parse::<i64>() {
            Ok(exp) if now.timestamp_millis() <= exp => Some(SecretString::from(token)),
            _ => {
                debug!("stored token expired or its expiry is unreadable, purging");
                self.clear();
                None
            }
        }
    }

    /// Absolute expiry of the held token, without purging.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.kv.get(TOKEN_KEY)?;
        let millis = self.kv.get(TOKEN_EXPIRY_KEY)?.trim().parse::<i64>().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Which credential the next request will carry.
    pub fn auth_mode(&self) -> AuthMode {
        if self.current().is_some() {
            AuthMode::Bearer
        } else {
            AuthMode::Cookie
        }
    }

    /// Drop the token and its expiry.
    pub fn clear(&self) {
        self.kv.remove(TOKEN_KEY);
        self.kv.remove(TOKEN_EXPIRY_KEY);
    }
}

// ── Expiry resolution ────────────────────────────────────────────────

/// Compute the absolute expiry for a freshly issued token.
///
/// An explicit `expires_at` wins: RFC 3339 strings (with or without an
/// offset, naive timestamps are UTC) or epoch numbers (milliseconds when
/// above 10^12, seconds otherwise). Otherwise `now + ttl_seconds`.
pub fn resolve_expiry(
    expires_at: Option<&Value>,
    ttl_seconds: Option<i64>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let explicit = expires_at.and_then(|value| match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(|raw| {
            if raw > EPOCH_MILLIS_THRESHOLD {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }),
        _ => None,
    });

    explicit.or_else(|| {
        let ttl = ttl_seconds?;
        now.checked_add_signed(chrono::Duration::try_seconds(ttl)?)
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn expired_token_is_purged_on_read() {
        let store = TokenStore::in_memory();
        let secret = SecretString::from("abc".to_string());
        store.store(&secret, at("2025-01-01T00:00:00Z"));

        assert!(store.current_at(at("2024-12-31T23:59:59Z")).is_some());
        assert!(store.current_at(at("2025-01-01T00:00:01Z")).is_none());
        // purged as a side effect
        assert!(store.kv().get(TOKEN_KEY).is_none());
        assert!(store.kv().get(TOKEN_EXPIRY_KEY).is_none());
    }

    #[test]
    fn token_valid_exactly_at_expiry() {
        let store = TokenStore::in_memory();
        let exp = at("2025-06-01T12:00:00Z");
        store.store(&SecretString::from("t".to_string()), exp);
        assert!(store.current_at(exp).is_some());
    }

    #[test]
    fn token_without_expiry_is_presented() {
        let store = TokenStore::in_memory();
        store.store(&SecretString::from("old".to_string()), at("2025-01-01T00:00:00Z"));
        store.store_without_expiry(&SecretString::from("open".to_string()));
        assert!(store.kv().get(TOKEN_EXPIRY_KEY).is_none());
        assert_eq!(
            store.current_at(at("2030-01-01T00:00:00Z")).map(|t| t.expose_secret().to_owned()),
            Some("open".to_owned())
        );
        assert_eq!(store.expires_at(), None);
        assert_eq!(store.auth_mode(), AuthMode::Bearer);
    }

    #[test]
    fn unreadable_expiry_purges_token() {
        let store = TokenStore::in_memory();
        store.kv().set(TOKEN_KEY, "t");
        store.kv().set(TOKEN_EXPIRY_KEY, "soon");
        assert!(store.current().is_none());
        assert!(store.kv().get(TOKEN_KEY).is_none());
        assert_eq!(store.auth_mode(), AuthMode::Cookie);
    }

    #[test]
    fn explicit_expiry_beats_ttl() {
        let now = at("2025-01-01T00:00:00Z");
        let exp = resolve_expiry(Some(&json!("2025-01-01T08:00:00Z")), Some(60), now);
        assert_eq!(exp, Some(at("2025-01-01T08:00:00Z")));
    }

    #[test]
    fn naive_expiry_is_utc() {
        let now = at("2025-01-01T00:00:00Z");
        let exp = resolve_expiry(Some(&json!("2025-01-02T00:00:00")), None, now);
        assert_eq!(exp, Some(at("2025-01-02T00:00:00Z")));
    }

    #[test]
    fn numeric_expiry_seconds_and_millis() {
        let now = at("2025-01-01T00:00:00Z");
        let secs = resolve_expiry(Some(&json!(1_735_689_600)), None, now);
        let millis = resolve_expiry(Some(&json!(1_735_689_600_000_i64)), None, now);
        assert_eq!(secs, Some(at("2025-01-01T00:00:00Z")));
        assert_eq!(millis, secs);
    }

    #[test]
    fn ttl_fallback() {
        let now = at("2025-01-01T00:00:00Z");
        assert_eq!(
            resolve_expiry(None, Some(3600), now),
            Some(at("2025-01-01T01:00:00Z"))
        );
        assert_eq!(resolve_expiry(Some(&json!(null)), None, now), None);
    }
}
