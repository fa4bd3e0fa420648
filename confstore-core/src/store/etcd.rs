use super::{KvStore, namespaced, strip_namespace, subtree_children_prefix};
use crate::{ConfError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use etcd_client::{
    Client, Compare, CompareOp, DeleteOptions, GetOptions, KvClient, SortOrder, SortTarget, Txn,
    TxnOp,
};

/// etcd-backed store. Keys live under `{namespace}/`.
#[derive(Clone)]
pub struct EtcdStore {
    kv: KvClient,
    namespace: String,
}

impl EtcdStore {
    pub async fn new(endpoints: &[String], namespace: &str) -> Result<Self> {
        let client = Client::connect(endpoints, None).await?;
        tracing::info!(
            "Connected to etcd endpoints={:?} namespace={}",
            endpoints,
            namespace
        );
        Ok(Self {
            kv: client.kv_client(),
            namespace: namespace.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        namespaced(&self.namespace, key)
    }
}

#[async_trait]
impl KvStore for EtcdStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut kv = self.kv.clone();
        let response = kv.get(self.full_key(key), None).await?;
        Ok(response
            .kvs()
            .first()
            .map(|pair| Bytes::copy_from_slice(pair.value())))
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Bytes)>> {
        let mut kv = self.kv.clone();
        let options = GetOptions::new()
            .with_prefix()
            .with_sort(SortTarget::Key, SortOrder::Ascend);
        let response = kv.get(self.full_key(prefix), Some(options)).await?;

        let mut pairs = Vec::with_capacity(response.kvs().len());
        for pair in response.kvs() {
            let full_key = pair.key_str()?;
            let key = strip_namespace(&self.namespace, full_key).ok_or_else(|| {
                ConfError::StoreUnavailable(format!(
                    "etcd returned key '{}' outside namespace '{}'",
                    full_key, self.namespace
                ))
            })?;
            pairs.push((key.to_string(), Bytes::copy_from_slice(pair.value())));
        }
        Ok(pairs)
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let mut kv = self.kv.clone();
        kv.put(self.full_key(key), value.to_vec(), None).await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: Bytes) -> Result<bool> {
        let mut kv = self.kv.clone();
        let full_key = self.full_key(key);
        let txn = Txn::new()
            .when(vec![Compare::create_revision(
                full_key.clone(),
                CompareOp::Equal,
                0,
            )])
            .and_then(vec![TxnOp::put(full_key, value.to_vec(), None)]);
        let response = kv.txn(txn).await?;
        Ok(response.succeeded())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut kv = self.kv.clone();
        let response = kv.delete(self.full_key(key), None).await?;
        Ok(response.deleted() > 0)
    }

    async fn delete_subtree(&self, root: &str) -> Result<u64> {
        let mut kv = self.kv.clone();
        let own = kv.delete(self.full_key(root), None).await?;
        let children = kv
            .delete(
                self.full_key(&subtree_children_prefix(root)),
                Some(DeleteOptions::new().with_prefix()),
            )
            .await?;
        Ok((own.deleted() + children.deleted()).max(0) as u64)
    }
}
