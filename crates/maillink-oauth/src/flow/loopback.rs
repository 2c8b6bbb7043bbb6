//! Loopback redirect listener for installed-app consent.
//!
//! Google redirects the browser to `http://127.0.0.1:<port>/?code=...&state=...`
//! once the user grants access. A one-route router serves that redirect and
//! hands the first `code` or `error` it sees back to the waiting flow; other
//! paths (favicon requests) get a 404.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Error, Result};

/// A bound listener waiting for the consent redirect.
#[derive(Debug)]
pub struct LoopbackRedirect {
    listener: TcpListener,
    redirect_uri: String,
}

#[derive(Clone)]
struct RedirectState {
    expected_state: Arc<str>,
    outcome: Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>,
}

impl RedirectState {
    fn settle(&self, outcome: Result<String>) {
        let sender = self
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }
}

#[derive(Debug, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl LoopbackRedirect {
    /// Binds an ephemeral port on 127.0.0.1.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            redirect_uri: format!("http://127.0.0.1:{port}"),
        })
    }

    /// The `redirect_uri` to register on the consent URL.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Serves the redirect until it arrives and returns the authorization
    /// code. The listener is shut down either way.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if nothing arrives in time, `AccessDenied` if the user
    /// declined, and `InvalidResponse` if the `state` does not match.
    pub async fn receive_code(self, expected_state: &str, timeout: Duration) -> Result<String> {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let app = router(RedirectState {
            expected_state: Arc::from(expected_state),
            outcome: Arc::new(Mutex::new(Some(outcome_tx))),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let served = axum::serve(self.listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                debug!(error = %e, "consent listener stopped");
            }
        });

        let outcome = tokio::time::timeout(timeout, outcome_rx).await;
        let _ = shutdown_tx.send(());
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::InvalidResponse(
                "consent listener closed before the redirect".into(),
            )),
            Err(_) => Err(Error::Timeout(timeout.as_secs())),
        }
    }
}

fn router(state: RedirectState) -> Router {
    Router::new().route("/", get(redirect)).with_state(state)
}

async fn redirect(
    State(state): State<RedirectState>,
    Query(params): Query<RedirectParams>,
) -> (StatusCode, &'static str) {
    if let Some(error) = params.error {
        state.settle(Err(if error == "access_denied" {
            Error::AccessDenied
        } else {
            Error::oauth_error(error, "consent redirect reported an error")
        }));
        return (StatusCode::OK, "Authorization was not granted.");
    }

    let Some(code) = params.code else {
        debug!("ignoring redirect without a code");
        return (StatusCode::NOT_FOUND, "Not found.");
    };

    if params.state.as_deref() != Some(&*state.expected_state) {
        state.settle(Err(Error::InvalidResponse("redirect state mismatch".into())));
        return (StatusCode::BAD_REQUEST, "State mismatch.");
    }

    state.settle(Ok(code));
    (StatusCode::OK, "Authorization complete. You can close this window.")
}
