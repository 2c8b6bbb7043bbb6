//! Observer lifecycle: wait for readiness, scan once, then re-scan per batch.

use tracing::{debug, info, warn};

use crate::document::{Document, MutationBatch, MutationStream, SharedDocument};
use crate::error::{Error, Result};
use crate::injector::{InjectedControl, Injector};

/// Where an observer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserverState {
    /// Not attached to a document yet.
    #[default]
    Uninitialized,
    /// Initial scan done; following mutations.
    Observing,
}

/// Keeps a document decorated as it changes.
#[derive(Debug, Default)]
pub struct Observer {
    injector: Injector,
    state: ObserverState,
    scans: u64,
}

impl Observer {
    /// Creates an unattached observer.
    #[must_use]
    pub const fn new(injector: Injector) -> Self {
        Self {
            injector,
            state: ObserverState::Uninitialized,
            scans: 0,
        }
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ObserverState {
        self.state
    }

    /// Scan passes run so far, the initial one included.
    #[must_use]
    pub const fn scans(&self) -> u64 {
        self.scans
    }

    /// The injector used for every pass.
    #[must_use]
    pub const fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Waits until the document is ready, runs the initial scan and
    /// subscribes to later mutations. The scan and the subscription happen
    /// under one borrow, so no change falls between them.
    ///
    /// # Errors
    ///
    /// `AlreadyObserving` on a second call, `DocumentClosed` if readiness can
    /// no longer change, or an error from the initial scan.
    pub async fn attach(
        &mut self,
        document: &SharedDocument,
    ) -> Result<(MutationStream, Vec<InjectedControl>)> {
        if self.state == ObserverState::Observing {
            return Err(Error::AlreadyObserving);
        }

        let mut readiness = document.borrow().readiness();
        readiness
            .wait_for(|state| state.is_ready())
            .await
            .map_err(|_| Error::DocumentClosed)?;

        let (stream, injected) = {
            let mut doc = document.borrow_mut();
            let injected = self.injector.scan(&mut doc)?;
            (doc.observe(), injected)
        };

        self.scans += 1;
        self.state = ObserverState::Observing;
        info!(controls = injected.len(), "initial scan complete, observing");
        Ok((stream, injected))
    }

    /// Handles one batch: a single re-scan if anything was added, however
    /// many nodes that was.
    ///
    /// # Errors
    ///
    /// Returns an error if the re-scan fails.
    pub fn handle_batch(
        &mut self,
        document: &mut Document,
        batch: &MutationBatch,
    ) -> Result<Vec<InjectedControl>> {
        if !batch.has_added_nodes() {
            return Ok(Vec::new());
        }
        self.scans += 1;
        let injected = self.injector.scan(document)?;
        debug!(
            added = batch.added_count(),
            injected = injected.len(),
            "re-scan after mutations"
        );
        Ok(injected)
    }

    /// Follows `stream` until the document is torn down. A failed re-scan is
    /// logged and observation continues.
    pub async fn run(&mut self, document: &SharedDocument, mut stream: MutationStream) {
        while let Some(batch) = stream.next().await {
            let result = self.handle_batch(&mut document.borrow_mut(), &batch);
            if let Err(e) = result {
                warn!(error = %e, "re-scan failed");
            }
        }
        debug!(scans = self.scans, "document torn down, observation ended");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::ReadyState;

    fn thread_rows(ids: impl IntoIterator<Item = usize>) -> String {
        ids.into_iter()
            .map(|i| format!(r#"<div class="zA" data-legacy-thread-id="t{i}"></div>"#))
            .collect()
    }

    #[tokio::test]
    async fn test_attach_waits_for_readiness() {
        let shared = Document::parse_html(&thread_rows([1])).shared();

        let page = async {
            tokio::task::yield_now().await;
            shared.borrow().set_ready_state(ReadyState::Complete);
        };

        let mut observer = Observer::default();
        assert_eq!(observer.state(), ObserverState::Uninitialized);
        let (attached, ()) = tokio::join!(observer.attach(&shared), page);
        let (_stream, injected) = attached.unwrap();
        assert_eq!(injected.len(), 1);
        assert_eq!(observer.state(), ObserverState::Observing);
        assert_eq!(observer.scans(), 1);
    }

    #[tokio::test]
    async fn test_second_attach_is_rejected() {
        let shared = Document::new().shared();
        shared.borrow().set_ready_state(ReadyState::Interactive);

        let mut observer = Observer::default();
        observer.attach(&shared).await.unwrap();
        assert!(matches!(
            observer.attach(&shared).await,
            Err(Error::AlreadyObserving)
        ));
    }

    #[tokio::test]
    async fn test_one_rescan_per_batch_regardless_of_size() {
        let shared = Document::new().shared();
        shared.borrow().set_ready_state(ReadyState::Complete);
        let mut observer = Observer::default();
        let (mut stream, _) = observer.attach(&shared).await.unwrap();

        {
            let mut doc = shared.borrow_mut();
            let body = doc.body();
            for i in 0..50 {
                doc.append_html(&body, &thread_rows([i]));
            }
            doc.flush();
        }

        let batch = stream.next().await.unwrap();
        assert_eq!(batch.added_count(), 50);
        let injected = observer
            .handle_batch(&mut shared.borrow_mut(), &batch)
            .unwrap();
        assert_eq!(injected.len(), 50);
        assert_eq!(observer.scans(), 2);
    }

    #[tokio::test]
    async fn test_removal_only_batch_does_not_rescan() {
        let shared = Document::parse_html(&thread_rows([1])).shared();
        shared.borrow().set_ready_state(ReadyState::Complete);
        let mut observer = Observer::default();
        let (mut stream, injected) = observer.attach(&shared).await.unwrap();

        {
            let mut doc = shared.borrow_mut();
            doc.remove(&injected[0].entity);
            doc.flush();
        }
        let batch = stream.next().await.unwrap();
        assert!(
            observer
                .handle_batch(&mut shared.borrow_mut(), &batch)
                .unwrap()
                .is_empty()
        );
        assert_eq!(observer.scans(), 1);
    }
}
