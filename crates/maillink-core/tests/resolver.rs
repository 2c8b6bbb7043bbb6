//! Resolver behavior against scripted API responses.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use std::time::Duration;

use maillink_core::{Error, HttpResponse, LinkService, Request, Response};
use serde_json::json;

use common::{
    JUST_OVER_TTL, StubIdentity, StubTransport, message_json, ok, resolver, resolver_with,
    thread_json,
};

#[tokio::test]
async fn message_link_from_metadata() {
    let (_, resolver) = resolver(StubTransport::scripted([ok(message_json(
        "18c2f0a1b",
        "<CAF1=x@mail.gmail.com>",
    ))]));

    let link = resolver.resolve_message_link("18c2f0a1b").await.unwrap();
    assert_eq!(
        link,
        "https://mail.google.com/mail/#search/rfc822msgid%3ACAF1%3Dx%40mail.gmail.com"
    );

    let requests = resolver.fetcher().transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].0,
        "https://gmail.googleapis.com/gmail/v1/users/me/messages/18c2f0a1b?format=metadata&metadataHeaders=Message-ID"
    );
    assert_eq!(requests[0].1, "Bearer silent-1");
}

#[tokio::test]
async fn second_lookup_within_ttl_is_served_from_cache() {
    let (clock, resolver) = resolver(StubTransport::scripted([ok(message_json("m1", "<a@b>"))]));

    let first = resolver.resolve_message_link("m1").await.unwrap();
    clock.advance(Duration::from_millis(119_000));
    let second = resolver.resolve_message_link("m1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(resolver.fetcher().transport().request_count(), 1);
    assert_eq!(resolver.cache().stats().hits, 1);
}

#[tokio::test]
async fn lookup_after_ttl_fetches_again() {
    let (clock, resolver) = resolver(StubTransport::scripted([
        ok(message_json("m1", "<a@b>")),
        ok(message_json("m1", "<a@b>")),
    ]));

    resolver.resolve_message_link("m1").await.unwrap();
    clock.advance(JUST_OVER_TTL);
    resolver.resolve_message_link("m1").await.unwrap();

    assert_eq!(resolver.fetcher().transport().request_count(), 2);
}

#[tokio::test]
async fn thread_link_uses_newest_message() {
    let (_, resolver) = resolver(StubTransport::scripted([ok(thread_json(
        "t1",
        &["<first@x>", "<second@x>", "<newest@x>"],
    ))]));

    let link = resolver.resolve_thread_last_link("t1").await.unwrap();
    assert!(link.ends_with("rfc822msgid%3Anewest%40x"));

    let requests = resolver.fetcher().transport().requests();
    assert!(requests[0].0.contains("/users/me/threads/t1?format=metadata"));
}

#[tokio::test]
async fn thread_newest_message_is_re_resolved_after_ttl() {
    let transport = StubTransport::scripted([ok(thread_json("t1", &["<one@x>"]))]);
    let (clock, resolver) = resolver(transport);

    let before = resolver.resolve_thread_last_link("t1").await.unwrap();
    resolver
        .fetcher()
        .transport()
        .push(ok(thread_json("t1", &["<one@x>", "<reply@x>"])));

    // Still cached: the reply is not visible yet.
    assert_eq!(resolver.resolve_thread_last_link("t1").await.unwrap(), before);

    clock.advance(JUST_OVER_TTL);
    let after = resolver.resolve_thread_last_link("t1").await.unwrap();
    assert!(after.ends_with("reply%40x"));
}

#[tokio::test]
async fn message_and_thread_lookups_do_not_share_entries() {
    let (_, resolver) = resolver(StubTransport::scripted([
        ok(message_json("x", "<m@x>")),
        ok(thread_json("x", &["<t@x>"])),
    ]));

    let message = resolver.resolve_message_link("x").await.unwrap();
    let thread = resolver.resolve_thread_last_link("x").await.unwrap();
    assert_ne!(message, thread);
    assert_eq!(resolver.fetcher().transport().request_count(), 2);
}

#[tokio::test]
async fn missing_header_is_reported_and_not_cached() {
    let no_header = r#"{"id":"m1","payload":{"headers":[{"name":"Subject","value":"hi"}]}}"#;
    let (_, resolver) = resolver(StubTransport::scripted([
        ok(no_header.to_string()),
        ok(r#"{"id":"m1"}"#.to_string()),
    ]));

    assert!(matches!(
        resolver.resolve_message_link("m1").await,
        Err(Error::HeaderMissing)
    ));
    assert!(matches!(
        resolver.resolve_message_link("m1").await,
        Err(Error::HeaderMissing)
    ));
    assert_eq!(resolver.fetcher().transport().request_count(), 2);
    assert_eq!(resolver.cache().stats().entries, 0);
}

#[tokio::test]
async fn blank_message_id_is_reported_and_not_cached() {
    let (_, resolver) = resolver(StubTransport::scripted([
        ok(message_json("m1", "<>")),
        ok(thread_json("t1", &["<a@x>", " < > "])),
    ]));

    assert!(matches!(
        resolver.resolve_message_link("m1").await,
        Err(Error::HeaderMissing)
    ));
    assert!(matches!(
        resolver.resolve_thread_last_link("t1").await,
        Err(Error::HeaderMissing)
    ));
    assert_eq!(resolver.cache().stats().entries, 0);
}

#[tokio::test]
async fn empty_thread_is_reported() {
    let (_, resolver) = resolver(StubTransport::scripted([
        ok(r#"{"id":"t1","messages":[]}"#.to_string()),
        ok(r#"{"id":"t2"}"#.to_string()),
    ]));

    assert!(matches!(
        resolver.resolve_thread_last_link("t1").await,
        Err(Error::EmptyThread)
    ));
    assert!(matches!(
        resolver.resolve_thread_last_link("t2").await,
        Err(Error::EmptyThread)
    ));
}

#[tokio::test]
async fn empty_id_is_rejected_without_network() {
    let (_, resolver) = resolver(StubTransport::default());
    assert!(matches!(
        resolver.resolve_message_link("").await,
        Err(Error::InvalidRequest(_))
    ));
    assert_eq!(resolver.fetcher().transport().request_count(), 0);
}

#[tokio::test]
async fn concurrent_lookups_of_one_key_both_fetch() {
    let (_, resolver) = resolver(StubTransport::scripted([
        ok(message_json("m1", "<a@b>")),
        ok(message_json("m1", "<a@b>")),
    ]));

    let (a, b) = tokio::join!(
        resolver.resolve_message_link("m1"),
        resolver.resolve_message_link("m1")
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(resolver.fetcher().transport().request_count(), 2);
    assert_eq!(resolver.cache().stats().entries, 1);
}

#[tokio::test]
async fn service_reports_failures_as_responses() {
    let (_, resolver) = resolver(StubTransport::scripted([ok(r#"{"id":"m1"}"#.to_string())]));

    let response = resolver
        .resolve(Request::Message {
            gmail_message_id: "m1".into(),
        })
        .await;
    assert_eq!(response, Response::failure("Message-ID header missing"));
}

#[tokio::test]
async fn service_answers_raw_requests() {
    let (_, resolver) = resolver(StubTransport::scripted([ok(thread_json("t9", &["<z@y>"]))]));

    let bogus = resolver.resolve_value(json!({"type": "bogus"})).await;
    assert_eq!(
        serde_json::to_value(&bogus).unwrap(),
        json!({"ok": false, "error": "Unknown message type"})
    );

    let response = resolver
        .resolve_value(json!({"type": "getDeepLinkForThreadLast", "threadId": "t9"}))
        .await;
    assert_eq!(
        response.into_result().unwrap(),
        "https://mail.google.com/mail/#search/rfc822msgid%3Az%40y"
    );
}

#[tokio::test]
async fn token_unavailable_surfaces_through_the_service() {
    let identity = StubIdentity {
        silent_unavailable: true,
        interactive_unavailable: true,
        ..StubIdentity::default()
    };
    let (_, resolver) = resolver_with(identity, StubTransport::default());

    let response = resolver
        .resolve(Request::ThreadLast {
            thread_id: "t1".into(),
        })
        .await;
    assert!(!response.ok);
    assert!(response.error.unwrap().starts_with("Token unavailable"));
    assert_eq!(resolver.fetcher().transport().request_count(), 0);
}

#[tokio::test]
async fn api_error_carries_status_and_body() {
    let (_, resolver) = resolver(StubTransport::scripted([HttpResponse::new(
        404,
        r#"{"error":{"code":404,"message":"Requested entity was not found."}}"#,
    )]));

    match resolver.resolve_message_link("gone").await {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 404);
            assert!(body.contains("Requested entity was not found."));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}
