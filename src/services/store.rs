use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

/// Key-value store with per-key TTLs, backing the token denylist, refresh
/// token records and password-reset links.
///
/// Production runs against Redis; the in-memory variant keeps development
/// and tests free of external services. Both variants share one contract:
/// a key is gone once its TTL elapses.
#[derive(Clone)]
pub enum TokenStore {
    Redis(redis::aio::MultiplexedConnection),
    Memory(Arc<Mutex<HashMap<String, MemoryEntry>>>),
}

#[derive(Clone)]
pub struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl TokenStore {
    pub fn memory() -> Self {
        Self::Memory(Arc::new(Mutex::new(HashMap::new())))
    }

    pub async fn connect_redis(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("could not connect to redis")?;
        Ok(Self::Redis(conn))
    }

    /// Stores `value` under `key`, expiring after `ttl_seconds`. Keys with a
    /// non-positive TTL are never written; the caller treats them as already
    /// expired.
    pub async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<()> {
        if ttl_seconds <= 0 {
            return Ok(());
        }
        match self {
            Self::Redis(conn) => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("EX")
                    .arg(ttl_seconds)
                    .query_async::<()>(&mut conn.clone())
                    .await
                    .context("redis SET failed")?;
                Ok(())
            }
            Self::Memory(map) => {
                let mut map = map.lock().await;
                let now = Instant::now();
                map.retain(|_, entry| entry.expires_at > now);
                map.insert(
                    key.to_string(),
                    MemoryEntry {
                        value: value.to_string(),
                        expires_at: now + Duration::from_secs(ttl_seconds as u64),
                    },
                );
                Ok(())
            }
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::Redis(conn) => {
                let value: Option<String> = redis::cmd("GET")
                    .arg(key)
                    .query_async(&mut conn.clone())
                    .await
                    .context("redis GET failed")?;
                Ok(value)
            }
            Self::Memory(map) => {
                let mut map = map.lock().await;
                let now = Instant::now();
                match map.get(key) {
                    Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
                    Some(_) => {
                        map.remove(key);
                        Ok(None)
                    }
                    None => Ok(None),
                }
            }
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        match self {
            Self::Redis(conn) => {
                redis::cmd("DEL")
                    .arg(key)
                    .query_async::<()>(&mut conn.clone())
                    .await
                    .context("redis DEL failed")?;
                Ok(())
            }
            Self::Memory(map) => {
                map.lock().await.remove(key);
                Ok(())
            }
        }
    }

    /// Remaining TTL in seconds, or `None` when the key does not exist.
    pub async fn ttl(&self, key: &str) -> Result<Option<i64>> {
        match self {
            Self::Redis(conn) => {
                let ttl: i64 = redis::cmd("TTL")
                    .arg(key)
                    .query_async(&mut conn.clone())
                    .await
                    .context("redis TTL failed")?;
                // -2 means missing key, -1 means no expiry; we never store
                // keys without one.
                Ok((ttl >= 0).then_some(ttl))
            }
            Self::Memory(map) => {
                let map = map.lock().await;
                let now = Instant::now();
                Ok(map.get(key).and_then(|entry| {
                    (entry.expires_at > now)
                        .then(|| entry.expires_at.duration_since(now).as_secs() as i64)
                }))
            }
        }
    }
}

pub fn access_denylist_key(token: &str) -> String {
    format!("denylist:access:{token}")
}

pub fn refresh_denylist_key(token: &str) -> String {
    format!("denylist:refresh:{token}")
}

pub fn refresh_record_key(token: &str) -> String {
    format!("refresh-record:{token}")
}

pub fn reset_link_key(account_id: Uuid) -> String {
    format!("reset-link:{account_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_their_ttl() {
        let store = TokenStore::memory();
        store.set_ex("k", "v", 10).await.unwrap();
        assert!(store.exists("k").await.unwrap());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_reports_remaining_seconds() {
        let store = TokenStore::memory();
        store.set_ex("k", "v", 30).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), Some(30));

        tokio::time::advance(Duration::from_secs(12)).await;
        assert_eq!(store.ttl("k").await.unwrap(), Some(18));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.ttl("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_positive_ttl_is_not_stored() {
        let store = TokenStore::memory();
        store.set_ex("gone", "v", 0).await.unwrap();
        store.set_ex("also-gone", "v", -5).await.unwrap();
        assert!(!store.exists("gone").await.unwrap());
        assert!(!store.exists("also-gone").await.unwrap());
    }

    #[tokio::test]
    async fn del_removes_a_live_entry() {
        let store = TokenStore::memory();
        store.set_ex("k", "v", 60).await.unwrap();
        store.del("k").await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn rewriting_a_key_replaces_its_ttl() {
        let store = TokenStore::memory();
        store.set_ex("k", "v", 100).await.unwrap();
        store.set_ex("k", "v", 5).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), Some(5));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!store.exists("k").await.unwrap());
    }
}
