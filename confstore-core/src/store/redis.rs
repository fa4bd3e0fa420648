use super::{KvStore, namespaced, strip_namespace, subtree_children_prefix};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

const DELETE_BATCH: usize = 256;

/// Redis-backed store. Keys live under `{namespace}/`; prefix listings use
/// `SCAN MATCH` and are sorted client-side.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisStore {
    pub async fn new(url: &str, namespace: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to redis url={} namespace={}", url, namespace);
        Ok(Self {
            conn,
            namespace: namespace.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        namespaced(&self.namespace, key)
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(&self.full_key(prefix)));
        let mut keys = Vec::new();
        {
            let mut iter = conn.scan_match::<_, String>(pattern).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.full_key(key)).await?;
        Ok(value.map(Bytes::from))
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Bytes)>> {
        let keys = self.scan_keys(prefix).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        // Keys removed between SCAN and MGET come back as nil and are dropped.
        Ok(keys
            .iter()
            .zip(values)
            .filter_map(|(full_key, value)| {
                let key = strip_namespace(&self.namespace, full_key)?;
                Some((key.to_string(), Bytes::from(value?)))
            })
            .collect())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.full_key(key), value.to_vec())
            .await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: Bytes) -> Result<bool> {
        let mut conn = self.conn.clone();
        let written: bool = conn.set_nx(self.full_key(key), value.to_vec()).await?;
        Ok(written)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(self.full_key(key)).await?;
        Ok(removed > 0)
    }

    async fn delete_subtree(&self, root: &str) -> Result<u64> {
        let mut keys = self.scan_keys(&subtree_children_prefix(root)).await?;
        keys.push(self.full_key(root));

        let mut conn = self.conn.clone();
        let mut removed = 0u64;
        for batch in keys.chunks(DELETE_BATCH) {
            let count: u64 = conn.del(batch.to_vec()).await?;
            removed += count;
        }
        Ok(removed)
    }
}

/// Escapes redis glob metacharacters so a key prefix matches literally.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
