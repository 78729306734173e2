use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, error};
use water_ledger::{KvStore, LedgerError};

/// `KvStore` over Redis.
///
/// Every key is stored as `{namespace}:{key}` so the ledger can share a
/// Redis instance; listing and clearing never see keys outside the namespace.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
    namespace: String,
}

impl RedisStore {
    pub fn new(redis: ConnectionManager, namespace: impl Into<String>) -> Self {
        RedisStore {
            redis,
            namespace: namespace.into(),
        }
    }

    pub async fn connect(url: &str, namespace: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self::new(redis, namespace))
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn scan_pattern(&self, prefix: &str) -> String {
        format!("{}*", escape_glob(&self.full_key(prefix)))
    }
}

/// Escape Redis glob metacharacters so a prefix matches literally
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn store_error(err: redis::RedisError) -> LedgerError {
    error!("Redis error: {}", err);
    LedgerError::Store(err.to_string())
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> water_ledger::Result<Option<String>> {
        self.redis
            .clone()
            .get::<_, Option<String>>(self.full_key(key))
            .await
            .map_err(store_error)
    }

    async fn put(&self, key: &str, value: &str) -> water_ledger::Result<()> {
        self.redis
            .clone()
            .set::<_, _, ()>(self.full_key(key), value)
            .await
            .map_err(store_error)
    }

    async fn delete(&self, key: &str) -> water_ledger::Result<()> {
        self.redis
            .clone()
            .del::<_, ()>(self.full_key(key))
            .await
            .map_err(store_error)
    }

    async fn list_keys(&self, prefix: &str) -> water_ledger::Result<Vec<String>> {
        let pattern = self.scan_pattern(prefix);
        let strip = format!("{}:", self.namespace);

        let mut conn = self.redis.clone();
        let mut iter = conn
            .scan_match::<_, String>(&pattern)
            .await
            .map_err(store_error)?;

        let mut keys = Vec::new();
        while let Some(full) = iter.next_item().await {
            if let Some(key) = full.strip_prefix(&strip) {
                keys.push(key.to_string());
            }
        }
        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();

        debug!(%pattern, count = keys.len(), "Scanned keys");
        Ok(keys)
    }
}
