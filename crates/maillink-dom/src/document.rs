//! Live HTML tree with mutation recording.
//!
//! The tree itself is a `kuchiki` node graph. Structural changes made through
//! [`Document`] (insertions and removals) are queued per subscriber and
//! delivered as one [`MutationBatch`] on [`Document::flush`], which marks the
//! end of a unit of page work. A subscriber only sees changes made after it
//! subscribed. Attribute changes are not observed.
//!
//! Nodes are reference counted and single-threaded, like a browser page: a
//! document and everything holding its nodes stay on one thread.

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::{LocalName, QualName, namespace_url, ns};
use kuchiki::NodeRef;
use kuchiki::traits::*;
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};

/// Loading progress of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    /// Still parsing.
    #[default]
    Loading,
    /// Parsed; subresources may still be loading.
    Interactive,
    /// Fully loaded.
    Complete,
}

impl ReadyState {
    /// Whether the document can be scanned and decorated.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        !matches!(self, Self::Loading)
    }
}

/// Children added to and removed from one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The parent whose child list changed.
    pub target: NodeRef,
    /// Inserted children.
    pub added: Vec<NodeRef>,
    /// Removed children.
    pub removed: Vec<NodeRef>,
}

/// Everything that changed during one unit of page work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    /// Records in the order the changes happened.
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    /// Whether any record inserted a node.
    #[must_use]
    pub fn has_added_nodes(&self) -> bool {
        self.records.iter().any(|r| !r.added.is_empty())
    }

    /// Total inserted nodes across records.
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.records.iter().map(|r| r.added.len()).sum()
    }
}

/// Subscription to a document's mutation batches.
///
/// Yields batches until the document is torn down. Dropping it unsubscribes;
/// calling [`Document::observe`] again starts a fresh subscription.
#[derive(Debug)]
pub struct MutationStream {
    rx: mpsc::UnboundedReceiver<MutationBatch>,
}

impl MutationStream {
    /// Waits for the next batch; `None` once the document is torn down.
    pub async fn next(&mut self) -> Option<MutationBatch> {
        self.rx.recv().await
    }

    /// Returns an already delivered batch without waiting.
    pub fn try_next(&mut self) -> Option<MutationBatch> {
        self.rx.try_recv().ok()
    }
}

/// Attribute and class access on element nodes. Non-elements have neither.
pub trait ElementExt {
    /// Lowercase tag name.
    fn tag(&self) -> Option<String>;
    /// Attribute value.
    fn attr(&self, name: &str) -> Option<String>;
    /// Sets an attribute. Not recorded as a mutation.
    fn set_attr(&self, name: &str, value: &str);
    /// Whether the `class` attribute lists `class`.
    fn has_class(&self, class: &str) -> bool;
}

impl ElementExt for NodeRef {
    fn tag(&self) -> Option<String> {
        self.as_element().map(|e| e.name.local.to_string())
    }

    fn attr(&self, name: &str) -> Option<String> {
        let element = self.as_element()?;
        let attributes = element.attributes.borrow();
        attributes.get(name).map(str::to_string)
    }

    fn set_attr(&self, name: &str, value: &str) {
        if let Some(element) = self.as_element() {
            element
                .attributes
                .borrow_mut()
                .insert(name, value.to_string());
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }
}

/// Creates a detached HTML element.
#[must_use]
pub fn create_element(tag: &str) -> NodeRef {
    let name = QualName::new(None, ns!(html), LocalName::from(tag.to_ascii_lowercase()));
    NodeRef::new_element(name, None)
}

#[derive(Debug)]
struct Subscriber {
    tx: mpsc::UnboundedSender<MutationBatch>,
    pending: Vec<MutationRecord>,
}

/// A live page.
#[derive(Debug)]
pub struct Document {
    root: NodeRef,
    subscribers: Vec<Subscriber>,
    ready: watch::Sender<ReadyState>,
}

/// A document shared between the observer and click handlers.
///
/// Borrows are held for synchronous tree work only.
pub type SharedDocument = Rc<RefCell<Document>>;

impl Document {
    /// Creates a loading document with an empty `body`.
    #[must_use]
    pub fn new() -> Self {
        Self::parse_html("")
    }

    /// Parses a saved page. Malformed markup is repaired the way a browser
    /// would, so this never fails.
    #[must_use]
    pub fn parse_html(html: &str) -> Self {
        let (ready, _) = watch::channel(ReadyState::Loading);
        Self {
            root: kuchiki::parse_html().one(html),
            subscribers: Vec::new(),
            ready,
        }
    }

    /// Wraps the document for sharing.
    #[must_use]
    pub fn shared(self) -> SharedDocument {
        Rc::new(RefCell::new(self))
    }

    /// The document node; every element descends from it.
    #[must_use]
    pub const fn root(&self) -> &NodeRef {
        &self.root
    }

    /// The `body` element, or the document node if there is none.
    #[must_use]
    pub fn body(&self) -> NodeRef {
        self.root
            .select_first("body")
            .map_or_else(|()| self.root.clone(), |body| body.as_node().clone())
    }

    /// Serializes the whole page.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.root.to_string()
    }

    /// Current loading progress.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        *self.ready.borrow()
    }

    /// Advances loading progress, waking readiness waiters.
    pub fn set_ready_state(&self, state: ReadyState) {
        self.ready.send_replace(state);
    }

    /// Watches loading progress.
    #[must_use]
    pub fn readiness(&self) -> watch::Receiver<ReadyState> {
        self.ready.subscribe()
    }

    /// Subscribes to mutation batches from now on.
    pub fn observe(&mut self) -> MutationStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(Subscriber {
            tx,
            pending: Vec::new(),
        });
        MutationStream { rx }
    }

    /// Ends the current unit of work: each subscriber with queued records
    /// receives them as one batch. Closed subscriptions are dropped.
    pub fn flush(&mut self) {
        self.subscribers.retain_mut(|sub| {
            if sub.pending.is_empty() {
                return !sub.tx.is_closed();
            }
            let batch = MutationBatch {
                records: std::mem::take(&mut sub.pending),
            };
            sub.tx.send(batch).is_ok()
        });
    }

    /// Tears the document down: every subscription ends.
    pub fn teardown(&mut self) {
        self.subscribers.clear();
    }

    /// Whether `node` is reachable from the document node.
    #[must_use]
    pub fn is_connected(&self, node: &NodeRef) -> bool {
        node.inclusive_ancestors().any(|a| a == self.root)
    }

    /// Appends `child` as the last child of `parent`, moving it if it is
    /// already attached elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyRequest` if `parent` lies inside `child`.
    pub fn append(&mut self, parent: &NodeRef, child: NodeRef) -> Result<()> {
        if parent.inclusive_ancestors().any(|a| a == child) {
            return Err(Error::HierarchyRequest);
        }
        self.remove(&child);
        parent.append(child.clone());
        self.record(MutationRecord {
            target: parent.clone(),
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Parses `html` in the context of `parent` and appends the result as a
    /// single insertion. Returns the inserted top-level nodes.
    pub fn append_html(&mut self, parent: &NodeRef, html: &str) -> Vec<NodeRef> {
        let context = parent.as_element().map_or_else(
            || QualName::new(None, ns!(html), LocalName::from("body")),
            |element| element.name.clone(),
        );
        let parsed = kuchiki::parse_fragment(context, Vec::new()).one(html);
        // The fragment parser wraps its output in an `html` element.
        let container = parsed
            .first_child()
            .filter(|wrapper| wrapper.tag().as_deref() == Some("html"))
            .unwrap_or(parsed);

        let added: Vec<NodeRef> = container.children().collect();
        for node in &added {
            parent.append(node.clone());
        }
        if !added.is_empty() {
            self.record(MutationRecord {
                target: parent.clone(),
                added: added.clone(),
                removed: Vec::new(),
            });
        }
        added
    }

    /// Detaches `node` (and its subtree) from its parent, if it has one.
    pub fn remove(&mut self, node: &NodeRef) {
        let Some(parent) = node.parent() else {
            return;
        };
        node.detach();
        self.record(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![node.clone()],
        });
    }

    fn record(&mut self, record: MutationRecord) {
        match self.subscribers.as_mut_slice() {
            [] => {}
            [only] => only.pending.push(record),
            subscribers => {
                for sub in subscribers {
                    sub.pending.push(record.clone());
                }
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
