mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use futures::future::join_all;
use prefetch_engine::{ExecutionMode, FetchOptions, PriorityDedup, RequestPool, RouteLookup};
use serde_json::json;
use tokio::time::sleep;

#[tokio::test]
async fn test_concurrent_background_lookups_share_one_request() {
    let transport = MockTransport::new();
    transport.reply(&route_url("about"), route_payload("/about", "t1", &[]));
    transport.set_latency(Duration::from_millis(20));
    let engine = engine(&transport);

    let lookups = (0..5).map(|_| engine.get_route_info("/about", FetchOptions::background()));
    let results = join_all(lookups).await;

    assert_eq!(transport.calls(&route_url("about")), 1);
    let first = results[0].clone().unwrap();
    for info in &results {
        assert!(Arc::ptr_eq(&first, info.as_ref().unwrap()));
    }
    assert!(engine.store().inflight_route_info().is_empty());
}

#[tokio::test]
async fn test_concurrent_background_lookups_share_failure() {
    let transport = MockTransport::new();
    transport.fail(&route_url("ghost"), 500);
    transport.fail(&route_url("404"), 404);
    transport.set_latency(Duration::from_millis(10));
    let engine = engine(&transport);

    let lookups = (0..3).map(|_| engine.lookup_route_info("/ghost", FetchOptions::background()));
    let results = join_all(lookups).await;

    assert_eq!(transport.calls(&route_url("ghost")), 1);
    assert!(results.iter().all(|r| matches!(r, RouteLookup::Errored)));
}

#[tokio::test]
async fn test_concurrent_failed_lookups_share_fallback() {
    let transport = MockTransport::new();
    transport.fail(&route_url("ghost"), 500);
    transport.set_delay(&route_url("ghost"), Duration::from_millis(20));
    transport.reply(&route_url("404"), route_payload("404", "nf", &[]));
    let engine = engine(&transport);

    let lookups = (0..3).map(|_| engine.lookup_route_info("/ghost", FetchOptions::background()));
    let results = join_all(lookups).await;

    assert_eq!(transport.calls(&route_url("ghost")), 1);
    assert_eq!(transport.calls(&route_url("404")), 1);
    let not_found = results[0].route_info().unwrap().clone();
    for lookup in &results {
        assert!(lookup.is_fallback(), "{lookup:?}");
        assert!(Arc::ptr_eq(&not_found, lookup.route_info().unwrap()));
    }
    assert_eq!(engine.stats().snapshot().fallbacks, 1);
    assert_eq!(engine.stats().snapshot().failures, 1);
}

#[tokio::test]
async fn test_abandoned_queued_lookup_does_not_stall_pool() {
    let transport = MockTransport::new();
    for path in ["a", "b", "c"] {
        transport.reply(&route_url(path), route_payload(path, "t1", &[]));
    }
    transport.set_delay(&route_url("a"), Duration::from_millis(30));
    let engine = engine_with_pool(&transport, RequestPool::new(1));

    let background = |path: &'static str| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.get_route_info(path, FetchOptions::background()).await })
    };
    let running = background("/a");
    let abandoned = background("/b");
    sleep(Duration::from_millis(5)).await;
    abandoned.abort();

    let later = tokio::time::timeout(
        Duration::from_secs(2),
        engine.get_route_info("/c", FetchOptions::background()),
    )
    .await;

    assert!(later.unwrap().is_some());
    assert!(running.await.unwrap().is_some());
    assert_eq!(engine.pool().running(), 0);
    assert_eq!(engine.pool().queued(), 0);

    // The abandoned request still ran; a new caller picks up its result.
    assert!(engine.get_route_info("/b", FetchOptions::background()).await.is_some());
    assert_eq!(transport.calls(&route_url("b")), 1);
    assert!(engine.store().inflight_route_info().is_empty());
}

#[tokio::test]
async fn test_cached_route_is_returned_without_request() {
    let transport = MockTransport::new();
    transport.reply(
        &route_url("about"),
        route_payload("/about", "t1", &[("title", "h1")]),
    );
    let engine = engine(&transport);

    let first = engine
        .lookup_route_info("/about", FetchOptions::background())
        .await;
    let second = engine
        .lookup_route_info("/about", FetchOptions::background())
        .await;

    assert_eq!(first.label(), "fetched");
    assert_eq!(second.label(), "hit");
    assert!(Arc::ptr_eq(
        first.route_info().unwrap(),
        second.route_info().unwrap()
    ));
    assert_eq!(transport.calls(&route_url("about")), 1);

    let cached = engine.store().route_info("about").unwrap();
    assert_eq!(cached.template(), Some("t1"));
    assert_eq!(cached.shared_hashes_by_prop()["title"], "h1");
}

#[tokio::test]
async fn test_failed_route_falls_back_to_not_found_once() {
    let transport = MockTransport::new();
    transport.fail(&route_url("ghost"), 404);
    transport.reply(&route_url("404"), route_payload("404", "nf", &[]));
    let engine = engine(&transport);

    let lookup = engine
        .lookup_route_info("/ghost", FetchOptions::background())
        .await;

    assert!(lookup.is_fallback());
    assert_eq!(lookup.route_info().unwrap().path(), "404");
    assert!(engine.is_route_errored("/ghost"));
    assert!(engine.cached_route_info("404").is_some());
    assert_eq!(engine.stats().snapshot().fallbacks, 1);

    // The not-found route is now cached, so the guard suppresses a second fallback.
    let again = engine
        .lookup_route_info("/ghost", FetchOptions::background())
        .await;
    assert!(matches!(again, RouteLookup::Errored));
    assert_eq!(transport.calls(&route_url("ghost")), 1);
    assert_eq!(transport.calls(&route_url("404")), 1);
}

#[tokio::test]
async fn test_failed_not_found_is_not_retried() {
    let transport = MockTransport::new();
    let engine = engine(&transport);

    let first = engine
        .lookup_route_info("/ghost", FetchOptions::background())
        .await;
    let second = engine
        .lookup_route_info("/phantom", FetchOptions::background())
        .await;

    assert!(matches!(first, RouteLookup::Errored));
    assert!(matches!(second, RouteLookup::Errored));
    assert!(engine.is_route_errored("404"));
    assert_eq!(transport.calls(&route_url("404")), 1);
    assert_eq!(engine.stats().snapshot().fallbacks, 1);
}

#[tokio::test]
async fn test_invalid_payload_is_errored_without_fallback() {
    let transport = MockTransport::new();
    transport.reply(&route_url("broken"), json!({ "template": "t1" }));
    transport.reply(&route_url("list"), json!(["not", "an", "object"]));
    transport.reply(&route_url("404"), route_payload("404", "nf", &[]));
    let engine = engine(&transport);

    let broken = engine
        .lookup_route_info("/broken", FetchOptions::background())
        .await;
    let list = engine
        .lookup_route_info("/list", FetchOptions::priority())
        .await;

    assert!(matches!(broken, RouteLookup::Errored));
    assert!(matches!(list, RouteLookup::Errored));
    assert!(engine.is_route_errored("broken"));
    assert!(engine.is_route_errored("list"));
    assert_eq!(transport.calls(&route_url("404")), 0);
}

#[tokio::test]
async fn test_errored_route_is_not_retried() {
    let transport = MockTransport::new();
    transport.reply(&route_url("broken"), json!({ "path": "" }));
    let engine = engine(&transport);

    engine
        .get_route_info("/broken", FetchOptions::background())
        .await;
    let again = engine
        .get_route_info("/broken", FetchOptions::priority())
        .await;

    assert!(again.is_none());
    assert_eq!(transport.calls(&route_url("broken")), 1);
}

#[tokio::test]
async fn test_non_prefetchable_paths_are_skipped() {
    let transport = MockTransport::new();
    let engine = engine(&transport);

    for href in ["https://other.example.com/page", "mailto:team@example.com", "/files/report.pdf"] {
        let lookup = engine.lookup_route_info(href, FetchOptions::background()).await;
        assert!(matches!(lookup, RouteLookup::Skipped), "{href}");
    }

    assert_eq!(transport.total_calls(), 0);
    assert_eq!(engine.snapshot().errored.len(), 0);
}

#[tokio::test]
async fn test_custom_classifier() {
    let transport = MockTransport::new();
    let engine = prefetch_engine::PrefetchEngine::builder(test_config())
        .shared_transport(transport.clone())
        .classifier(|path: &str| !path.starts_with("admin"))
        .build()
        .unwrap();

    let lookup = engine
        .lookup_route_info("/admin/users", FetchOptions::background())
        .await;

    assert!(matches!(lookup, RouteLookup::Skipped));
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn test_priority_lookup_never_joins_or_creates_inflight_entries() {
    let transport = MockTransport::new();
    transport.reply(&route_url("about"), route_payload("/about", "t1", &[]));
    transport.set_latency(Duration::from_millis(20));
    let engine = engine(&transport);

    let (priority_only, inflight_during_priority) = tokio::join!(
        engine.get_route_info("/about", FetchOptions::priority()),
        async {
            sleep(Duration::from_millis(5)).await;
            engine.store().inflight_route_info().len()
        }
    );
    assert!(priority_only.is_some());
    assert_eq!(inflight_during_priority, 0);

    engine.reload_route_data();

    let (background, priority) = tokio::join!(
        engine.get_route_info("/about", FetchOptions::background()),
        async {
            sleep(Duration::from_millis(5)).await;
            engine.get_route_info("/about", FetchOptions::priority()).await
        }
    );
    assert!(background.is_some());
    assert!(priority.is_some());
    assert_eq!(transport.calls(&route_url("about")), 3);
    assert_eq!(engine.stats().snapshot().route_requests, 3);
}

#[tokio::test]
async fn test_join_inflight_policy_reuses_background_request() {
    let transport = MockTransport::new();
    transport.reply(&route_url("about"), route_payload("/about", "t1", &[]));
    transport.set_latency(Duration::from_millis(20));
    let config = test_config().with_priority_dedup(PriorityDedup::JoinInflight);
    let engine = engine_with(config, &transport);

    let (background, priority) = tokio::join!(
        engine.get_route_info("/about", FetchOptions::background()),
        async {
            sleep(Duration::from_millis(5)).await;
            engine.get_route_info("/about", FetchOptions::priority()).await
        }
    );

    assert_eq!(transport.calls(&route_url("about")), 1);
    assert!(Arc::ptr_eq(&background.unwrap(), &priority.unwrap()));
    assert!(engine.store().inflight_route_info().is_empty());
}

#[tokio::test]
async fn test_development_mode_uses_live_endpoint() {
    let transport = MockTransport::new();
    transport.reply(
        "/__react-static__/routeInfo/blog/post",
        json!({
            "path": "blog/post",
            "template": "post",
            "sharedHashesByProp": { "title": "h1" },
            "sharedData": { "title": "Hello" },
        }),
    );
    transport.reply(
        "/__react-static__/routeInfo/",
        route_payload("/", "home", &[]),
    );
    let config = test_config().with_mode(ExecutionMode::Development);
    let engine = engine_with(config, &transport);

    let post = engine
        .get_route_info("/blog/post/", FetchOptions::background())
        .await
        .unwrap();
    let home = engine.get_route_info("/", FetchOptions::priority()).await;

    assert!(post.is_hydrated());
    assert_eq!(post.shared_prop("title").as_deref(), Some(&json!("Hello")));
    assert!(home.is_some());
    assert_eq!(transport.calls(&route_url("blog/post")), 0);
}

#[tokio::test]
async fn test_cache_bust_token_is_appended() {
    let transport = MockTransport::new();
    transport.reply(
        "/about/routeInfo.json?v=42",
        route_payload("/about", "t1", &[]),
    );
    let engine = engine_with(test_config().with_cache_bust("v=42"), &transport);

    assert!(engine
        .get_route_info("/about", FetchOptions::background())
        .await
        .is_some());
}
