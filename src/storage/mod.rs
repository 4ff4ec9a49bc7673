//! Local key-value storage
//!
//! The app persists exactly three string-valued keys: the access token,
//! the refresh token, and the serialized store snapshot. Encryption at
//! rest is delegated to the host platform; this layer only defines the
//! interface and two backends (SQLite for devices, in-memory for tests).

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::Result;

/// Key under which the access token is stored
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Key under which the refresh token is stored
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Key under which the serialized store snapshot is stored
pub const STORE_SNAPSHOT_KEY: &str = "kindred-store";

/// String key-value storage with encrypted-at-rest guarantees delegated
/// to the backend implementation
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Access/refresh token pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Load the stored token pair, if both halves are present
pub async fn load_tokens(store: &dyn KeyValueStore) -> Result<Option<TokenPair>> {
    let access = store.get(ACCESS_TOKEN_KEY).await?;
    let refresh = store.get(REFRESH_TOKEN_KEY).await?;
    Ok(match (access, refresh) {
        (Some(access), Some(refresh)) => Some(TokenPair { access, refresh }),
        _ => None,
    })
}

/// Persist a token pair
pub async fn store_tokens(store: &dyn KeyValueStore, tokens: &TokenPair) -> Result<()> {
    store.set(ACCESS_TOKEN_KEY, &tokens.access).await?;
    store.set(REFRESH_TOKEN_KEY, &tokens.refresh).await?;
    Ok(())
}

/// Remove both tokens (logout). Idempotent.
pub async fn clear_tokens(store: &dyn KeyValueStore) -> Result<()> {
    store.delete(ACCESS_TOKEN_KEY).await?;
    store.delete(REFRESH_TOKEN_KEY).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_round_trip() {
        let store = MemoryStore::new();
        assert!(load_tokens(&store).await.unwrap().is_none());

        let pair = TokenPair {
            access: "acc-1".into(),
            refresh: "ref-1".into(),
        };
        store_tokens(&store, &pair).await.unwrap();
        assert_eq!(load_tokens(&store).await.unwrap(), Some(pair));

        clear_tokens(&store).await.unwrap();
        assert!(load_tokens(&store).await.unwrap().is_none());

        // clearing again is a no-op
        clear_tokens(&store).await.unwrap();
    }

    #[tokio::test]
    async fn half_pair_is_treated_as_logged_out() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, "acc-only").await.unwrap();
        assert!(load_tokens(&store).await.unwrap().is_none());
    }
}
