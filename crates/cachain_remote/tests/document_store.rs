// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `DocumentStoreCache`.

use std::time::Duration;

use bytes::Bytes;
use cachain_remote::{
    BinMap, DocumentStoreCache, DocumentStoreConfig, Host, RecordKey, UserKey,
    testing::{InMemoryDocumentStore, RemoteOp},
};
use cachain_tier::{Cacher, ErrorKind, Key, ZeroTtl, testing::LogCapture};
use tick::{Clock, ClockControl};

fn block_on<F: Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn config() -> DocumentStoreConfig {
    DocumentStoreConfig {
        hosts: vec!["10.0.0.1:3000".to_string(), "10.0.0.2:3001".to_string()],
        username: "svc".to_string(),
        namespace: "cache".to_string(),
        set_name: "sessions".to_string(),
        bin_name: "payload".to_string(),
        ..DocumentStoreConfig::default()
    }
}

fn cache_with(clock: Clock) -> (DocumentStoreCache<InMemoryDocumentStore>, InMemoryDocumentStore) {
    let store = InMemoryDocumentStore::new(clock.clone());
    (DocumentStoreCache::new(config(), store.clone(), clock), store)
}

#[test]
fn init_connects_with_parsed_hosts_and_policy() {
    block_on(async {
        let (cache, store) = cache_with(Clock::new_frozen());
        cache.init().await.unwrap();

        assert_eq!(store.connect_count(), 1);
        assert_eq!(
            store.last_hosts().unwrap(),
            vec![Host::new("10.0.0.1", 3000), Host::new("10.0.0.2", 3001)]
        );
        let policy = store.last_policy().unwrap();
        assert_eq!(policy.user, "svc");
        assert_eq!(policy.connection_queue_size, 256);

        // Already initialized
        cache.init().await.unwrap();
        assert_eq!(store.connect_count(), 1);
    });
}

#[test]
fn init_fails_without_hosts() {
    block_on(async {
        let clock = Clock::new_frozen();
        let store = InMemoryDocumentStore::new(clock.clone());
        let cache = DocumentStoreCache::new(DocumentStoreConfig::default(), store.clone(), clock);

        let error = cache.init().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Internal);
        assert!(format!("{error:?}").contains("document store hosts are not defined"));
        assert_eq!(store.connect_count(), 0);
        assert!(cache.get(Key::from("k")).await.unwrap_err().is_not_ready());
    });
}

#[test]
fn init_fails_on_malformed_host() {
    block_on(async {
        let clock = Clock::new_frozen();
        let config = DocumentStoreConfig {
            hosts: vec!["10.0.0.1".to_string()],
            ..config()
        };
        let cache = DocumentStoreCache::new(config, InMemoryDocumentStore::new(clock.clone()), clock);

        let error = cache.init().await.unwrap_err();
        assert!(format!("{error:?}").contains("bad host format '10.0.0.1'"));
    });
}

#[test]
fn connect_failure_is_internal() {
    block_on(async {
        let (cache, store) = cache_with(Clock::new_frozen());
        store.fail_when(|op| op == RemoteOp::Connect);

        assert_eq!(cache.init().await.unwrap_err().kind(), ErrorKind::Internal);

        store.clear_failures();
        cache.init().await.unwrap();
    });
}

#[test]
fn not_ready_before_init_and_after_close() {
    block_on(async {
        let (cache, store) = cache_with(Clock::new_frozen());
        let payload = Bytes::from_static(b"v");

        assert!(cache.get(Key::from("k")).await.unwrap_err().is_not_ready());
        assert!(cache.set(Key::from("k"), payload.clone(), Duration::ZERO).await.unwrap_err().is_not_ready());
        assert!(cache.del(Key::from("k")).await.unwrap_err().is_not_ready());

        cache.init().await.unwrap();
        cache.set(Key::from("k"), payload, Duration::ZERO).await.unwrap();
        cache.close().await;
        cache.close().await;

        assert_eq!(store.close_count(), 1);
        assert!(cache.get_with_ttl(Key::from("k")).await.unwrap_err().is_not_ready());
    });
}

#[test]
fn record_expiration_carries_ttl() {
    block_on(async {
        let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(50_000));
        let (cache, _store) = cache_with(control.to_clock());
        cache.init().await.unwrap();

        cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::from_millis(10_500)).await.unwrap();
        assert_eq!(
            cache.get_with_ttl(Key::from("k")).await.unwrap(),
            (Bytes::from_static(b"v"), Duration::from_secs(10))
        );

        control.advance(Duration::from_secs(4));
        assert_eq!(cache.get_with_ttl(Key::from("k")).await.unwrap().1, Duration::from_secs(6));

        control.advance(Duration::from_secs(6));
        assert!(cache.get(Key::from("k")).await.unwrap_err().is_miss());
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    });
}

#[test]
fn zero_ttl_never_expires() {
    block_on(async {
        let control = ClockControl::new();
        let (cache, _store) = cache_with(control.to_clock());
        cache.init().await.unwrap();
        assert_eq!(cache.zero_ttl(), ZeroTtl::NoExpiry);

        cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::ZERO).await.unwrap();
        control.advance(Duration::from_secs(86_400 * 365));
        assert_eq!(cache.get_with_ttl(Key::from("k")).await.unwrap().1, Duration::ZERO);
    });
}

#[test]
fn string_and_byte_keys_address_different_records() {
    block_on(async {
        let (cache, _store) = cache_with(Clock::new_frozen());
        cache.init().await.unwrap();

        cache.set(Key::from("k"), Bytes::from_static(b"str"), Duration::ZERO).await.unwrap();
        assert!(cache.get(Key::from(b"k")).await.unwrap_err().is_miss());

        cache.set(Key::from(b"k"), Bytes::from_static(b"blob"), Duration::ZERO).await.unwrap();
        assert_eq!(cache.get(Key::from("k")).await.unwrap(), Bytes::from_static(b"str"));
        assert_eq!(cache.get(Key::from(b"k")).await.unwrap(), Bytes::from_static(b"blob"));
    });
}

#[test]
fn transport_errors_are_internal_not_miss() {
    block_on(async {
        let (cache, store) = cache_with(Clock::new_frozen());
        cache.init().await.unwrap();
        cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::ZERO).await.unwrap();

        store.fail_when(|op| matches!(op, RemoteOp::Get | RemoteOp::Set | RemoteOp::Del));

        let error = cache.get(Key::from("k")).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Internal);
        assert!(format!("{error:?}").contains("simulated Get failure"));
        assert_eq!(
            cache.set(Key::from("k"), Bytes::new(), Duration::ZERO).await.unwrap_err().kind(),
            ErrorKind::Internal
        );
        assert_eq!(cache.del(Key::from("k")).await.unwrap_err().kind(), ErrorKind::Internal);
        assert_eq!(cache.misses(), 0);
    });
}

#[test]
fn record_without_payload_bin_is_internal() {
    block_on(async {
        let (cache, store) = cache_with(Clock::new_frozen());
        cache.init().await.unwrap();

        let key = RecordKey {
            namespace: "cache".to_string(),
            set_name: "sessions".to_string(),
            user_key: UserKey::Str("k".to_string()),
        };
        store.insert_record(key, BinMap::from([("other".to_string(), Bytes::from_static(b"v"))]), Duration::ZERO);

        let error = cache.get(Key::from("k")).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Internal);
        assert!(format!("{error:?}").contains("record has no bin named 'payload'"));
    });
}

#[test]
fn del_reports_missing_records() {
    block_on(async {
        let (cache, _store) = cache_with(Clock::new_frozen());
        cache.init().await.unwrap();

        assert!(cache.del(Key::from("k")).await.unwrap_err().is_miss());
        cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::ZERO).await.unwrap();
        cache.del(Key::from("k")).await.unwrap();
        assert!(cache.get(Key::from("k")).await.unwrap_err().is_miss());
    });
}

#[test]
fn requests_are_timed() {
    block_on(async {
        let clock = ClockControl::new().auto_advance(Duration::from_millis(5)).to_clock();
        let (cache, _store) = cache_with(clock);
        assert_eq!(cache.avg_request_time(), Duration::ZERO);

        cache.init().await.unwrap();
        cache.set(Key::from("k"), Bytes::from_static(b"v"), Duration::ZERO).await.unwrap();
        let _ = cache.get(Key::from("k")).await;

        assert_eq!(cache.request_count(), 3);
        assert!(cache.avg_request_time() >= Duration::from_millis(5));
    });
}

#[test]
fn failures_are_logged_as_errors() {
    let capture = LogCapture::new();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    block_on(async {
        let (cache, store) = cache_with(Clock::new_frozen());
        cache.init().await.unwrap();
        store.fail_when(|op| op == RemoteOp::Get);
        let _ = cache.get(Key::from("k")).await;
    });

    capture.assert_contains("ERROR");
    capture.assert_contains("cache.get");
    capture.assert_contains("simulated Get failure");
}

#[tokio::test]
async fn usable_from_spawned_tasks() {
    let clock = Clock::new_frozen();
    let (cache, _store) = cache_with(clock);
    let cache = std::sync::Arc::new(cache);
    cache.init().await.unwrap();

    let writer = std::sync::Arc::clone(&cache);
    tokio::spawn(async move { writer.set(Key::from("k"), Bytes::from_static(b"v"), Duration::ZERO).await })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(cache.get(Key::from("k")).await.unwrap(), Bytes::from_static(b"v"));
}
