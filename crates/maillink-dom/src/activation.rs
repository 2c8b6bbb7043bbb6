//! What happens when a control is clicked.
//!
//! The request goes to a [`LinkService`]; on success the link is written to
//! the clipboard and a success acknowledgment shown, otherwise a failure
//! acknowledgment is shown and the clipboard is left untouched. Resolution is
//! not cancelled if the control disappears in the meantime.

use std::fmt;

use kuchiki::NodeRef;
use tracing::{info, warn};

use maillink_core::{LinkService, Request};

use crate::error::Result;
use crate::injector::Injector;

/// System clipboard.
pub trait Clipboard: Send + Sync {
    /// Replaces the clipboard contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Clipboard` if the write is rejected.
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Transient acknowledgment display (toast, desktop notification).
pub trait Notifier: Send + Sync {
    /// Shows `ack` briefly.
    fn notify(&self, ack: Acknowledgment);
}

/// Feedback shown after an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgment {
    /// The link is on the clipboard.
    Copied,
    /// Nothing was copied.
    Failed,
}

impl Acknowledgment {
    /// User-facing text.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Copied => "Link copied",
            Self::Failed => "Could not copy link",
        }
    }
}

impl fmt::Display for Acknowledgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The link that was copied.
    Copied(String),
    /// Why nothing was copied.
    Failed(String),
}

/// Click handler bound to a link service and the page collaborators.
#[derive(Debug)]
pub struct Activator<S, C, N> {
    service: S,
    clipboard: C,
    notifier: N,
}

impl<S, C, N> Activator<S, C, N>
where
    S: LinkService,
    C: Clipboard,
    N: Notifier,
{
    /// Creates an activator.
    #[must_use]
    pub const fn new(service: S, clipboard: C, notifier: N) -> Self {
        Self {
            service,
            clipboard,
            notifier,
        }
    }

    /// Resolves `request`, copies the link and acknowledges.
    pub async fn activate(&self, request: Request) -> Outcome {
        let outcome = match self.service.resolve(request).await.into_result() {
            Ok(url) => match self.clipboard.write_text(&url) {
                Ok(()) => Outcome::Copied(url),
                Err(e) => Outcome::Failed(e.to_string()),
            },
            Err(error) => Outcome::Failed(error),
        };

        match &outcome {
            Outcome::Copied(url) => {
                info!(%url, "link copied");
                self.notifier.notify(Acknowledgment::Copied);
            }
            Outcome::Failed(error) => {
                warn!(%error, "copy link failed");
                self.notifier.notify(Acknowledgment::Failed);
            }
        }
        outcome
    }

    /// Activates `control`. The request is read off the element before
    /// resolving, so the page may drop it meanwhile. Returns `None` if
    /// `control` is not a control.
    pub async fn activate_control(
        &self,
        injector: &Injector,
        control: &NodeRef,
    ) -> Option<Outcome> {
        let request = injector.request_for(control)?;
        Some(self.activate(request).await)
    }
}
