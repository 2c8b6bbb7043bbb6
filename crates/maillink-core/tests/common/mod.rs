//! Scripted identity and transport doubles.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use maillink_core::{
    AuthenticatedFetch, DEFAULT_TTL, HttpResponse, HttpTransport, LinkCache, ManualClock,
    Resolver, ResolverConfig,
};
use maillink_oauth::{AccessToken, IdentityProvider};
use url::Url;

/// Identity whose silent and interactive paths can be switched off.
#[derive(Default)]
pub struct StubIdentity {
    pub silent_unavailable: bool,
    pub interactive_unavailable: bool,
    pub silent_calls: AtomicUsize,
    pub interactive_calls: AtomicUsize,
    pub invalidated: Mutex<Vec<String>>,
}

impl StubIdentity {
    pub fn silent_calls(&self) -> usize {
        self.silent_calls.load(Ordering::SeqCst)
    }

    pub fn interactive_calls(&self) -> usize {
        self.interactive_calls.load(Ordering::SeqCst)
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.lock().unwrap().clone()
    }
}

impl IdentityProvider for StubIdentity {
    async fn acquire(&self, interactive: bool) -> maillink_oauth::Result<AccessToken> {
        if interactive {
            let n = self.interactive_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.interactive_unavailable {
                return Err(maillink_oauth::Error::AccessDenied);
            }
            Ok(AccessToken::new(format!("interactive-{n}")))
        } else {
            let n = self.silent_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.silent_unavailable {
                return Err(maillink_oauth::Error::NoCachedToken);
            }
            Ok(AccessToken::new(format!("silent-{n}")))
        }
    }

    async fn invalidate(&self, token: &AccessToken) {
        self.invalidated
            .lock()
            .unwrap()
            .push(token.secret().to_string());
    }
}

/// Transport that replays queued responses and records what was asked.
#[derive(Default)]
pub struct StubTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl StubTransport {
    pub fn scripted(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    pub fn push(&self, response: HttpResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// `(url, authorization)` pairs in request order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpTransport for StubTransport {
    async fn get(&self, url: &Url, authorization: &str) -> maillink_core::Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), authorization.to_string()));
        // Suspend like a real request would, so concurrent callers interleave.
        tokio::task::yield_now().await;
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| HttpResponse::new(500, "unscripted request")))
    }
}

pub type TestResolver = Resolver<StubIdentity, StubTransport, Arc<ManualClock>>;

pub fn resolver_with(
    identity: StubIdentity,
    transport: StubTransport,
) -> (Arc<ManualClock>, TestResolver) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cache = LinkCache::with_clock(Arc::clone(&clock), DEFAULT_TTL);
    let resolver = Resolver::new(
        AuthenticatedFetch::new(identity, transport),
        cache,
        ResolverConfig::default(),
    )
    .unwrap();
    (clock, resolver)
}

pub fn resolver(transport: StubTransport) -> (Arc<ManualClock>, TestResolver) {
    resolver_with(StubIdentity::default(), transport)
}

pub fn message_json(id: &str, message_id: &str) -> String {
    format!(
        r#"{{"id":"{id}","threadId":"t-{id}","payload":{{"headers":[{{"name":"Message-ID","value":"{message_id}"}}]}}}}"#
    )
}

pub fn thread_json(id: &str, message_ids: &[&str]) -> String {
    let messages: Vec<String> = message_ids
        .iter()
        .enumerate()
        .map(|(i, mid)| message_json(&format!("{id}-{i}"), mid))
        .collect();
    format!(r#"{{"id":"{id}","messages":[{}]}}"#, messages.join(","))
}

pub fn ok(body: String) -> HttpResponse {
    HttpResponse::new(200, body)
}

pub const JUST_OVER_TTL: Duration = Duration::from_millis(120_001);
