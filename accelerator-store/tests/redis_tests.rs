#[cfg(feature = "redis")]
#[cfg(test)]
mod tests {
    use accelerator_store::bytes::Bytes;
    use accelerator_store::{
        CacheStore, ManualClock, RedisCacheStore, StatusCode, Ttl, fingerprint,
    };
    use dotenvy::dotenv;
    use rustis::client::Client;
    use rustis::commands::{GenericCommands, HashCommands, SetCommands};
    use serial_test::serial;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn get_redis_connection() -> Client {
        dotenv().ok();
        let uri = std::env::var("REDIS_URI").expect("Set REDIS_URI env variable");
        Client::connect(uri)
            .await
            .expect("Error while establishing redis connection")
    }

    // Remove every key left by a previous run of the same test
    async fn cleanup(prefix: &str) {
        let redis = get_redis_connection().await;
        let keys: Vec<String> = redis
            .keys(format!("{}*", prefix))
            .await
            .expect("Failed to get keys");
        if !keys.is_empty() {
            redis.del(keys).await.expect("Failed to delete keys");
        }
    }

    async fn setup_store(test_name: &str) -> (RedisCacheStore, ManualClock) {
        let prefix = format!("acc-test-{}.", test_name);
        cleanup(&prefix).await;
        let clock = ManualClock::starting_now();
        let store = RedisCacheStore::new(get_redis_connection().await, &prefix)
            .await
            .expect("Failed to create RedisCacheStore")
            .with_clock(Arc::new(clock.clone()));
        (store, clock)
    }

    fn tags(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn body(text: &'static str) -> Vec<Bytes> {
        vec![Bytes::from_static(text.as_bytes())]
    }

    #[tokio::test]
    #[serial]
    async fn test_set_and_get() {
        let (store, _clock) = setup_store("set-get").await;
        let headers = vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("X-Dup".to_string(), "1".to_string()),
            ("X-Dup".to_string(), "2".to_string()),
        ];
        let chunks = vec![Bytes::from("hello "), Bytes::from("world")];

        let etag = store
            .set("/a?x=1", StatusCode::OK, &headers, &chunks, Ttl::Seconds(5), &tags(&["foo"]))
            .await
            .expect("Failed to set entry");

        let entry = store.get("/a?x=1").await.unwrap().expect("entry should be cached");
        assert_eq!(entry.status, StatusCode::OK);
        assert_eq!(entry.headers, headers);
        assert_eq!(entry.body_bytes(), Bytes::from("hello world"));
        assert_eq!(entry.etag, etag);
        assert_eq!(etag, fingerprint(&chunks));
        assert_eq!(entry.tags, tags(&["foo"]));

        let keys = store.get_keys_by_tag("foo").await.unwrap();
        assert_eq!(keys, HashSet::from(["/a?x=1".to_string()]));

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_binary_body_and_custom_status() {
        let (store, _clock) = setup_store("binary").await;
        let chunks = vec![Bytes::from_static(&[0u8, 159, 146, 150, 255])];
        let status = StatusCode::from_u16(250).unwrap();

        store
            .set("/bin", status, &[], &chunks, Ttl::Seconds(5), &[])
            .await
            .unwrap();

        let entry = store.get("/bin").await.unwrap().unwrap();
        assert_eq!(entry.status.as_u16(), 250);
        assert_eq!(entry.body, chunks);

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_expiry_purges_entry_and_tags() {
        let (store, clock) = setup_store("expiry").await;
        store
            .set("/a", StatusCode::OK, &[], &body("x"), Ttl::Seconds(5), &tags(&["foo"]))
            .await
            .unwrap();

        clock.advance_secs(4);
        assert!(store.get("/a").await.unwrap().is_some());

        clock.advance_secs(2);
        assert!(store.get("/a").await.unwrap().is_none());
        assert!(store.get_keys_by_tag("foo").await.unwrap().is_empty());

        let exists: usize = store
            .client
            .exists([store.get_entry_key("/a")])
            .await
            .unwrap();
        assert_eq!(exists, 0);

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_set_replaces_tags() {
        let (store, _clock) = setup_store("replace").await;
        store
            .set("/a", StatusCode::OK, &[], &body("1"), Ttl::Seconds(5), &tags(&["foo", "bar"]))
            .await
            .unwrap();
        store
            .set("/a", StatusCode::OK, &[], &body("2"), Ttl::Seconds(5), &tags(&["baz"]))
            .await
            .unwrap();

        assert!(store.get_keys_by_tag("foo").await.unwrap().is_empty());
        assert!(store.get_keys_by_tag("bar").await.unwrap().is_empty());
        assert_eq!(store.get("/a").await.unwrap().unwrap().tags, tags(&["baz"]));

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_invalidate_shared_tag() {
        let (store, _clock) = setup_store("shared-tag").await;
        store
            .set("/a", StatusCode::OK, &[], &body("a"), Ttl::Seconds(5), &tags(&["foo", "bar"]))
            .await
            .unwrap();
        store
            .set("/b", StatusCode::OK, &[], &body("b"), Ttl::Seconds(5), &tags(&["bar", "baz"]))
            .await
            .unwrap();

        store.invalidate_tag(&tags(&["bar", "bogus"])).await.unwrap();

        assert!(store.get("/a").await.unwrap().is_none());
        assert!(store.get("/b").await.unwrap().is_none());
        for tag in ["foo", "bar", "baz"] {
            assert!(store.get_keys_by_tag(tag).await.unwrap().is_empty());
        }

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_invalidate_key_returns_tags() {
        let (store, _clock) = setup_store("invalidate-key").await;
        store
            .set("/a", StatusCode::OK, &[], &body("a"), Ttl::Seconds(5), &tags(&["foo", "bar"]))
            .await
            .unwrap();

        let dirty = store.invalidate_key("/a").await.unwrap();
        assert_eq!(dirty, tags(&["foo", "bar"]));
        assert!(!store.contains("/a").await.unwrap());
        assert!(store.get_keys_by_tag("foo").await.unwrap().is_empty());

        assert!(store.invalidate_key("/a").await.unwrap().is_empty());

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_malformed_record_is_absent() {
        let (store, _clock) = setup_store("malformed").await;
        store
            .client
            .hset(
                store.get_entry_key("/broken"),
                [("status", "200"), ("headers", "{not json"), ("tags", "[]")],
            )
            .await
            .unwrap();

        assert!(store.get("/broken").await.unwrap().is_none());

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_tag_set_layout() {
        let (store, _clock) = setup_store("layout").await;
        store
            .set("/a", StatusCode::OK, &[], &body("a"), Ttl::Seconds(5), &tags(&["foo"]))
            .await
            .unwrap();

        let members: HashSet<String> = store
            .client
            .smembers(format!("{}tag.foo", store.key_prefix))
            .await
            .unwrap();
        assert_eq!(members, HashSet::from(["/a".to_string()]));

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_huge_ttl_is_stored() {
        let (store, clock) = setup_store("huge-ttl").await;
        store
            .set("/a", StatusCode::OK, &[], &body("a"), Ttl::Seconds(i64::MAX), &tags(&["foo"]))
            .await
            .unwrap();

        clock.advance_secs(10 * 365 * 24 * 3600);
        assert!(store.get("/a").await.unwrap().is_some());
        assert_eq!(
            store.get_keys_by_tag("foo").await.unwrap(),
            HashSet::from(["/a".to_string()])
        );

        cleanup(&store.key_prefix).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[serial]
    async fn test_concurrent_writes_keep_tag_index_consistent() {
        let (store, _clock) = setup_store("concurrent").await;
        let prefix = store.key_prefix.clone();
        let mut handles = Vec::new();
        for i in 0..32 {
            // one client per writer, WATCH is tracked per connection
            let writer: RedisCacheStore =
                RedisCacheStore::new(get_redis_connection().await, &prefix)
                    .await
                    .unwrap();
            handles.push(tokio::spawn(async move {
                let tag = if i % 2 == 0 { "even" } else { "odd" };
                writer
                    .set("/a", StatusCode::OK, &[], &body("a"), Ttl::Seconds(60), &tags(&[tag]))
                    .await
                    .unwrap();
                if i % 5 == 0 {
                    writer.invalidate_tag(&tags(&["even"])).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let even = store.get_keys_by_tag("even").await.unwrap();
        let odd = store.get_keys_by_tag("odd").await.unwrap();
        match store.get("/a").await.unwrap() {
            Some(entry) => {
                let expected = HashSet::from(["/a".to_string()]);
                if entry.tags == tags(&["even"]) {
                    assert_eq!(even, expected);
                    assert!(odd.is_empty());
                } else {
                    assert_eq!(entry.tags, tags(&["odd"]));
                    assert_eq!(odd, expected);
                    assert!(even.is_empty());
                }
            }
            None => {
                assert!(even.is_empty());
                assert!(odd.is_empty());
            }
        }

        cleanup(&prefix).await;
    }
}
