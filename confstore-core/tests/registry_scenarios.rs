use confstore_core::{
    Config, ConfError, ConfigRepository, Group, GroupConfig, GroupLayout, GroupRepository,
    KvStore, MemoryStore, StoreGateway,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn labels(pairs: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn config_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let configs = ConfigRepository::new(StoreGateway::new(store.clone()));

    let created = assert_ok!(
        configs
            .create(Config {
                entries: labels(&[("k", "v")]),
                version: "v1".to_string(),
                id: String::new(),
            })
            .await
    );
    assert!(!created.id.is_empty());

    let read = assert_ok!(configs.read(&created.id, "v1").await);
    assert_eq!(read.entries, labels(&[("k", "v")]));

    let confirmation = assert_ok!(configs.delete(&created.id, "v1").await);
    assert_eq!(confirmation.id, created.id);

    let error = assert_err!(configs.read(&created.id, "v1").await);
    assert!(matches!(error, ConfError::NotFound(_)));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn group_label_query() {
    for layout in [GroupLayout::Document, GroupLayout::LabelIndexed] {
        let store = Arc::new(MemoryStore::new());
        let groups = GroupRepository::new(StoreGateway::new(store.clone())).with_layout(layout);

        let prod = GroupConfig {
            entries: labels(&[("env", "prod")]),
            values: labels(&[("replicas", "3")]),
        };
        let dev = GroupConfig {
            entries: labels(&[("env", "dev")]),
            values: labels(&[("replicas", "1")]),
        };

        let created = assert_ok!(
            groups
                .create(Group {
                    configs: vec![prod.clone(), dev],
                    version: "v1".to_string(),
                    id: String::new(),
                })
                .await
        );

        let found = assert_ok!(groups.query_by_label(&created.id, "v1", "env:prod").await);
        assert_eq!(found, vec![prod]);

        let none = assert_ok!(
            groups
                .query_by_label(&created.id, "v1", "env:prod;region:us")
                .await
        );
        assert!(none.is_empty());

        assert_ok!(groups.delete(&created.id, "v1").await);
        assert!(store.list_prefix("groups/").await.unwrap().is_empty());

        let error = assert_err!(groups.query_by_label(&created.id, "v1", "env:prod").await);
        assert!(matches!(error, ConfError::NotFound(_)));
    }
}

#[tokio::test]
async fn configs_and_groups_share_a_store_without_colliding() {
    let store = Arc::new(MemoryStore::new());
    let gateway = StoreGateway::new(store.clone());
    let configs = ConfigRepository::new(gateway.clone());
    let groups = GroupRepository::new(gateway);

    let config = assert_ok!(
        configs
            .create(Config {
                entries: labels(&[("k", "v")]),
                version: "v1".to_string(),
                id: String::new(),
            })
            .await
    );
    let group = assert_ok!(
        groups
            .create(Group {
                configs: Vec::new(),
                version: "v1".to_string(),
                id: String::new(),
            })
            .await
    );

    assert_eq!(store.list_prefix("configs/").await.unwrap().len(), 1);
    assert_eq!(store.list_prefix("groups/").await.unwrap().len(), 1);

    assert!(matches!(
        groups.read(&config.id, "v1").await,
        Err(ConfError::NotFound(_))
    ));
    assert!(matches!(
        configs.read(&group.id, "v1").await,
        Err(ConfError::NotFound(_))
    ));
}
