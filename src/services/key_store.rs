//! Key store adapter: API key lifecycle against the database.
//!
//! Handlers depend on the [`KeyStore`] trait, not on a concrete backend, so
//! tests can swap in [`InMemoryKeyStore`] without a running database.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::api_key::ApiKey};

/// Hash a raw key token for storage and lookup.
///
/// Both the database and the key cache index keys by this digest; the raw
/// token only exists in the creating request and in authenticating requests.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new raw key token: 32 random bytes, hex encoded.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Key lifecycle operations.
///
/// Every method is a single bounded database operation; none of them scan.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Look up an active key by token hash, across all owners.
    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError>;

    /// Create a key for `owner_id`. The token is generated here, never
    /// caller-supplied; the returned String is the only copy of it.
    async fn create(&self, owner_id: &str, name: &str) -> Result<(ApiKey, String), AppError>;

    /// Revoke a key, scoped to its owner. Terminal: once inactive, the key
    /// is invisible to this call, so a second revoke yields `KeyNotFound`.
    async fn deactivate(&self, owner_id: &str, key_id: Uuid) -> Result<(), AppError>;

    /// Atomically add one successful search to the key's usage count.
    ///
    /// Single-statement increment, no read-modify-write, so concurrent
    /// searches never lose updates.
    async fn record_search_usage(&self, key_id: Uuid) -> Result<(), AppError>;

    /// Stamp `last_used` on a successful verify.
    async fn touch_last_used(&self, key_id: Uuid) -> Result<(), AppError>;

    /// All keys belonging to an owner, for usage reporting.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ApiKey>, AppError>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}

/// PostgreSQL-backed key store.
#[derive(Clone)]
pub struct PgKeyStore {
    pool: DbPool,
}

impl PgKeyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        // Hits the partial index on (key_hash) WHERE active.
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, owner_id, key_hash, name, active, created_at, last_used, usage_count
            FROM api_keys
            WHERE key_hash = $1 AND active = true
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn create(&self, owner_id: &str, name: &str) -> Result<(ApiKey, String), AppError> {
        let token = generate_token();

        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (owner_id, key_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, key_hash, name, active, created_at, last_used, usage_count
            "#,
        )
        .bind(owner_id)
        .bind(hash_token(&token))
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok((key, token))
    }

    async fn deactivate(&self, owner_id: &str, key_id: Uuid) -> Result<(), AppError> {
        // Scoping by owner_id enforces ownership; scoping by active makes
        // revocation terminal and the second call a KeyNotFound.
        let result = sqlx::query(
            "UPDATE api_keys SET active = false WHERE id = $1 AND owner_id = $2 AND active = true",
        )
        .bind(key_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::KeyNotFound);
        }

        Ok(())
    }

    async fn record_search_usage(&self, key_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE api_keys SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(key_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn touch_last_used(&self, key_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE api_keys SET last_used = NOW() WHERE id = $1")
            .bind(key_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ApiKey>, AppError> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, owner_id, key_hash, name, active, created_at, last_used, usage_count
            FROM api_keys
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// In-memory key store used by handler tests.
///
/// Honors the same contracts as [`PgKeyStore`]: owner-scoped terminal
/// deactivation and increment-under-lock usage counting.
#[cfg(test)]
pub struct InMemoryKeyStore {
    keys: std::sync::Mutex<Vec<ApiKey>>,
}

#[cfg(test)]
impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self {
            keys: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn usage_count(&self, key_id: Uuid) -> i64 {
        let keys = self.keys.lock().unwrap();
        keys.iter()
            .find(|k| k.id == key_id)
            .map(|k| k.usage_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let keys = self.keys.lock().unwrap();
        Ok(keys
            .iter()
            .find(|k| k.key_hash == key_hash && k.active)
            .cloned())
    }

    async fn create(&self, owner_id: &str, name: &str) -> Result<(ApiKey, String), AppError> {
        let token = generate_token();
        let key = ApiKey {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            key_hash: hash_token(&token),
            name: name.to_string(),
            active: true,
            created_at: chrono::Utc::now(),
            last_used: None,
            usage_count: 0,
        };

        let mut keys = self.keys.lock().unwrap();
        keys.push(key.clone());
        Ok((key, token))
    }

    async fn deactivate(&self, owner_id: &str, key_id: Uuid) -> Result<(), AppError> {
        let mut keys = self.keys.lock().unwrap();
        match keys
            .iter_mut()
            .find(|k| k.id == key_id && k.owner_id == owner_id && k.active)
        {
            Some(key) => {
                key.active = false;
                Ok(())
            }
            None => Err(AppError::KeyNotFound),
        }
    }

    async fn record_search_usage(&self, key_id: Uuid) -> Result<(), AppError> {
        let mut keys = self.keys.lock().unwrap();
        if let Some(key) = keys.iter_mut().find(|k| k.id == key_id) {
            key.usage_count += 1;
        }
        Ok(())
    }

    async fn touch_last_used(&self, key_id: Uuid) -> Result<(), AppError> {
        let mut keys = self.keys.lock().unwrap();
        if let Some(key) = keys.iter_mut().find(|k| k.id == key_id) {
            key.last_used = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ApiKey>, AppError> {
        let keys = self.keys.lock().unwrap();
        Ok(keys
            .iter()
            .filter(|k| k.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_at_least_128_bits_of_entropy() {
        // 32 random bytes -> 64 hex chars.
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn hash_is_stable_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn created_key_is_findable_by_hash() {
        let store = InMemoryKeyStore::new();
        let (key, token) = store.create("user-1", "test key").await.unwrap();

        let found = store
            .find_active_by_hash(&hash_token(&token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, key.id);
        assert_eq!(found.usage_count, 0);
    }

    #[tokio::test]
    async fn deactivate_is_terminal_and_owner_scoped() {
        let store = InMemoryKeyStore::new();
        let (key, token) = store.create("user-1", "k").await.unwrap();

        // Wrong owner cannot revoke.
        assert!(matches!(
            store.deactivate("user-2", key.id).await,
            Err(AppError::KeyNotFound)
        ));

        store.deactivate("user-1", key.id).await.unwrap();
        assert!(
            store
                .find_active_by_hash(&hash_token(&token))
                .await
                .unwrap()
                .is_none()
        );

        // Second revoke: not found, not a crash, key stays inactive.
        assert!(matches!(
            store.deactivate("user-1", key.id).await,
            Err(AppError::KeyNotFound)
        ));
        let keys = store.list_by_owner("user-1").await.unwrap();
        assert!(!keys[0].active);
    }
}
