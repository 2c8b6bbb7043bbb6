//! # maillink-dom
//!
//! Keeps a copy-link control attached to every message and thread the Gmail
//! web UI renders, however often the page re-renders.
//!
//! - [`Document`] is a live `kuchiki` HTML tree that records structural
//!   changes and delivers them to subscribers in batches
//! - [`AnchorRules`] say which elements are messages or threads and where a
//!   control goes, as ordered CSS selector candidates
//! - [`Injector`] attaches controls, at most one per entity
//! - [`Observer`] runs the initial scan once the page is ready and re-scans
//!   once per batch that added nodes
//! - [`Activator`] turns a click into a link request, a clipboard write and a
//!   transient acknowledgment
//!
//! Page-side types hold reference-counted nodes and stay on one thread; only
//! link requests cross to the resolver, through a [`maillink_core::LinkService`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod activation;
pub mod anchor;
pub mod document;
mod error;
pub mod injector;
pub mod observer;

pub use activation::{Acknowledgment, Activator, Clipboard, Notifier, Outcome};
pub use anchor::{AnchorRules, Candidate, EntityKind, EntityRule, Placement};
pub use document::{
    Document, ElementExt, MutationBatch, MutationRecord, MutationStream, ReadyState,
    SharedDocument, create_element,
};
pub use error::{Error, Result};
pub use injector::{InjectedControl, Injector};
pub use kuchiki::NodeRef;
pub use observer::{Observer, ObserverState};
