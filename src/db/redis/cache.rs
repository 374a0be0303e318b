use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Server-side session keyed by the opaque cookie value
    Session(String),
    /// Pending Spotify authorization, keyed by the OAuth `state` parameter
    OAuthState(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Session(id) => write!(f, "session:{}", id),
            CacheKey::OAuthState(state) => write!(f, "oauth_state:{}", state),
        }
    }
}

/// Creates a Redis client for session storage
///
/// Opening the client does not connect; connections are made lazily
/// per operation through the multiplexed connection.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Cache handler for storing and retrieving data from Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
}

impl Cache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    fn decode<T: serde::de::DeserializeOwned>(raw: Option<String>) -> AppResult<Option<T>> {
        match raw {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    fn encode<T: serde::Serialize>(value: &T) -> AppResult<String> {
        serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` when the key is absent or has expired.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Self::decode(cached)
    }

    /// Retrieves and removes a value in a single round trip
    ///
    /// Used for one-shot values such as OAuth `state` tokens.
    pub async fn take<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get_del(key.to_string()).await?;
        Self::decode(cached)
    }

    /// Stores a value with a TTL, creating the key if needed
    pub async fn set<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) -> AppResult<()> {
        let json = Self::encode(value)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key.to_string(), json, ttl).await?;
        Ok(())
    }

    /// Removes a key
    pub async fn delete(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }

    /// Overwrites a value only while its key still exists
    ///
    /// Returns `false` when the key is gone (expired or deleted), in which
    /// case nothing is written.
    pub async fn replace<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) -> AppResult<bool> {
        let json = Self::encode(value)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key.to_string())
            .arg(json)
            .arg("EX")
            .arg(ttl)
            .arg("XX")
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[test]
    fn test_cache_key_display_session() {
        let key = CacheKey::Session("5b1c".to_string());
        assert_eq!(format!("{}", key), "session:5b1c");
    }

    #[test]
    fn test_cache_key_display_oauth_state() {
        let key = CacheKey::OAuthState("abc123".to_string());
        assert_eq!(format!("{}", key), "oauth_state:abc123");
    }

    #[test]
    fn test_create_client_rejects_bad_url() {
        assert!(create_redis_client("not a url").is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running redis"]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let cache = Cache::new(client);

        let key = CacheKey::Session("nonexistent_key_12345".to_string());
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running redis"]
    async fn test_take_removes_value() {
        let client = create_redis_client(&redis_url()).unwrap();
        let cache = Cache::new(client);

        let key = CacheKey::OAuthState("test_take".to_string());
        cache.set(&key, &42_i64, 60).await.unwrap();

        let first: Option<i64> = cache.take(&key).await.unwrap();
        let second: Option<i64> = cache.take(&key).await.unwrap();
        assert_eq!(first, Some(42));
        assert_eq!(second, None);
    }

    #[tokio::test]
    #[ignore = "requires a running redis"]
    async fn test_replace_only_touches_live_keys() {
        let client = create_redis_client(&redis_url()).unwrap();
        let cache = Cache::new(client);

        let key = CacheKey::Session("test_replace".to_string());
        cache.delete(&key).await.unwrap();

        assert!(!cache.replace(&key, &1_i64, 60).await.unwrap());
        let missing: Option<i64> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(missing, None);

        cache.set(&key, &1_i64, 60).await.unwrap();
        assert!(cache.replace(&key, &2_i64, 60).await.unwrap());
        let updated: Option<i64> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(updated, Some(2));

        cache.delete(&key).await.unwrap();
    }
}
