// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Chains mixing in-process and network-backed tiers.

use std::time::Duration;

use bytes::Bytes;
use cachain::{
    Cacher, Chain, DocumentStoreCache, DocumentStoreConfig, DynamicCacher, DynamicCacherExt, ErrorKind, EvictingCache, Key,
    KeyValueCache, KeyValueConfig,
};
use cachain_remote::testing::{InMemoryDocumentStore, InMemoryKeyValueStore, RemoteOp};
use tick::{Clock, ClockControl};

fn block_on<F: Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

struct Stack {
    chain: Chain,
    near: DynamicCacher,
    key_value: InMemoryKeyValueStore,
    documents: InMemoryDocumentStore,
}

fn stack(clock: &Clock) -> Stack {
    let key_value = InMemoryKeyValueStore::new(clock.clone());
    let documents = InMemoryDocumentStore::new(clock.clone());
    let near = EvictingCache::builder(clock.clone()).build().into_dynamic();

    let kv_config: KeyValueConfig = serde_json::from_str(r#"{ "host": "10.1.0.1:6379", "pool_size": 4 }"#).unwrap();
    let doc_config = DocumentStoreConfig {
        hosts: vec!["10.2.0.1:3000".to_string()],
        namespace: "cache".to_string(),
        set_name: "chain".to_string(),
        bin_name: "payload".to_string(),
        ..DocumentStoreConfig::default()
    };

    let chain = Chain::builder()
        .tier(near.clone())
        .tier(KeyValueCache::new(kv_config, key_value.clone(), clock.clone()).into_dynamic())
        .tier(DocumentStoreCache::new(doc_config, documents.clone(), clock.clone()).into_dynamic())
        .build()
        .unwrap();

    Stack {
        chain,
        near,
        key_value,
        documents,
    }
}

#[test]
fn hit_in_document_store_backfills_both_faster_tiers() {
    block_on(async {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(7_000));
        let stack = stack(&control.to_clock());
        stack.chain.init().await.unwrap();

        let far = stack.chain.tier(2).unwrap();
        far.set(Key::from("session"), Bytes::from_static(b"token"), Duration::from_secs(300)).await.unwrap();
        control.advance(Duration::from_secs(100));

        assert_eq!(
            stack.chain.get_with_ttl(Key::from("session")).await.unwrap(),
            (Bytes::from_static(b"token"), Duration::from_secs(200))
        );
        assert_eq!(
            stack.near.get_with_ttl(Key::from("session")).await.unwrap().1,
            Duration::from_secs(200)
        );
        assert_eq!(stack.key_value.key_count(), 1);
    });
}

#[test]
fn unreachable_service_fails_chain_init() {
    block_on(async {
        let stack = stack(&Clock::new_frozen());
        stack.key_value.fail_when(|op| op == RemoteOp::Ping);

        let error = stack.chain.init().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Internal);
        assert_eq!(stack.documents.connect_count(), 0);

        stack.key_value.clear_failures();
        stack.chain.init().await.unwrap();
        assert_eq!(stack.documents.connect_count(), 1);

        stack.chain.close().await;
        assert_eq!(stack.key_value.close_count(), 2);
        assert_eq!(stack.documents.close_count(), 1);
    });
}

#[test]
fn tolerating_chain_survives_a_network_outage() {
    block_on(async {
        let stack = stack(&Clock::new_frozen());
        stack.chain.set_tolerate_adapter_errors(true);
        stack.chain.init().await.unwrap();

        stack.key_value.fail_when(|op| op != RemoteOp::Ping);
        stack
            .chain
            .set(Key::from("k"), Bytes::from_static(b"v"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(stack.documents.record_count(), 1);

        stack.near.del(Key::from("k")).await.unwrap();
        assert_eq!(stack.chain.get(Key::from("k")).await.unwrap(), Bytes::from_static(b"v"));
    });
}
