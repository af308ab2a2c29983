// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for type-erased cachers.

use std::time::Duration;

use bytes::Bytes;
use cachain_tier::testing::{CacheOp, MockCacher};
use cachain_tier::{Cacher, DynamicCacher, DynamicCacherExt, Key, ZeroTtl};
use tick::Clock;

fn block_on<F: Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[test]
fn dynamic_forwards_every_operation() {
    block_on(async {
        let mock = MockCacher::new(Clock::new_frozen());
        let cacher: DynamicCacher = mock.clone().into_dynamic();

        cacher.init().await.unwrap();
        cacher.set(Key::from("k"), Bytes::from_static(b"v"), Duration::from_secs(30)).await.unwrap();
        let (payload, ttl) = cacher.get_with_ttl(Key::from("k")).await.unwrap();
        assert_eq!(payload, Bytes::from_static(b"v"));
        assert_eq!(ttl, Duration::from_secs(30));
        assert_eq!(cacher.get(Key::from("k")).await.unwrap(), payload);
        cacher.del(Key::from("k")).await.unwrap();
        assert!(cacher.get(Key::from("k")).await.unwrap_err().is_miss());
        cacher.close().await;

        assert_eq!(cacher.hits(), 2);
        assert_eq!(cacher.misses(), 1);
        assert_eq!(cacher.zero_ttl(), ZeroTtl::NoExpiry);
        assert_eq!(
            mock.operations(),
            vec![
                CacheOp::Init,
                CacheOp::Set {
                    key: Bytes::from_static(b"k"),
                    payload: Bytes::from_static(b"v"),
                    ttl: Duration::from_secs(30),
                },
                CacheOp::GetWithTtl(Bytes::from_static(b"k")),
                CacheOp::Get(Bytes::from_static(b"k")),
                CacheOp::Del(Bytes::from_static(b"k")),
                CacheOp::Get(Bytes::from_static(b"k")),
                CacheOp::Close,
            ]
        );
    });
}

#[test]
fn clones_share_the_backend() {
    block_on(async {
        let cacher = MockCacher::new(Clock::new_frozen()).into_dynamic();
        let other = cacher.clone();

        cacher.init().await.unwrap();
        cacher.set(Key::from("shared"), Bytes::from_static(b"1"), Duration::ZERO).await.unwrap();
        assert_eq!(other.get(Key::from("shared")).await.unwrap(), Bytes::from_static(b"1"));
        assert_eq!(cacher.hits(), 1);
    });
}

#[test]
fn string_and_byte_keys_address_the_same_entry() {
    block_on(async {
        let cacher = MockCacher::new(Clock::new_frozen()).into_dynamic();
        cacher.init().await.unwrap();

        cacher.set(Key::from("user:1"), Bytes::from_static(b"alice"), Duration::ZERO).await.unwrap();
        assert_eq!(
            cacher.get(Key::from(b"user:1")).await.unwrap(),
            Bytes::from_static(b"alice")
        );
    });
}

#[tokio::test]
async fn dynamic_is_send_across_tasks() {
    let cacher = MockCacher::new(Clock::new_frozen()).into_dynamic();
    cacher.init().await.unwrap();

    let task_cacher = cacher.clone();
    tokio::spawn(async move {
        task_cacher
            .set(Key::from("from-task"), Bytes::from_static(b"x"), Duration::ZERO)
            .await
            .unwrap();
    })
    .await
    .unwrap();

    assert!(cacher.get(Key::from("from-task")).await.is_ok());
}
