//! Desktop collaborators: clipboard, notifications and the consent prompt.

use std::time::Duration;

use notify_rust::{Notification, Timeout};
use tracing::debug;
use url::Url;

use maillink_dom::{Acknowledgment, Clipboard, Error, Notifier};

/// How long an acknowledgment stays on screen.
const TOAST_DURATION: Duration = Duration::from_secs(3);

/// The system clipboard via `arboard`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> maillink_dom::Result<()> {
        arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_text(text.to_owned()))
            .map_err(|e| Error::Clipboard(e.to_string()))
    }
}

/// Desktop notifications via `notify-rust`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, ack: Acknowledgment) {
        let timeout = u32::try_from(TOAST_DURATION.as_millis()).unwrap_or(u32::MAX);
        let shown = Notification::new()
            .appname("maillink")
            .summary("maillink")
            .body(ack.message())
            .timeout(Timeout::Milliseconds(timeout))
            .show();
        // Headless sessions have no notification daemon.
        if let Err(e) = shown {
            debug!(error = %e, "notification not shown");
        }
    }
}

/// Asks the user to open the consent URL.
pub fn print_consent_url(url: &Url) -> maillink_oauth::Result<()> {
    eprintln!("To allow maillink to read message headers, open this URL in a browser:\n\n  {url}\n");
    Ok(())
}

/// Consent prompt type used by the CLI.
pub type ConsentPrinter = fn(&Url) -> maillink_oauth::Result<()>;
