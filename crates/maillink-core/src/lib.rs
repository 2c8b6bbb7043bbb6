//! # maillink-core
//!
//! Turns a Gmail message id, or a thread id ("whatever is newest in this
//! thread"), into a deep link that opens the same message for anyone with
//! access to it, whichever account slot or folder they view it from.
//!
//! This crate provides:
//! - **Link building** - Message-ID normalization and `rfc822msgid:` search links
//! - **Authenticated fetch** - bearer-token GETs with one re-authorization on 401
//! - **Link cache** - two-minute, lazily expiring cache of resolved Message-IDs
//! - **Resolver** - the two lookups, wired to the Gmail metadata endpoints
//! - **Boundary protocol** - the JSON request/response contract and a
//!   channel-backed client for callers on the other side of it

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod clock;
mod error;
pub mod fetch;
pub mod gmail;
pub mod link;
pub mod protocol;
pub mod resolver;
pub mod transport;

pub use cache::{CacheKey, CacheStats, DEFAULT_TTL, LinkCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use fetch::AuthenticatedFetch;
pub use gmail::{GmailEndpoints, MessageMetadata, ThreadMetadata};
pub use link::{DEFAULT_MAIL_HOST, build_link, normalize_message_id};
pub use protocol::{ChannelService, Envelope, LinkService, Request, Response, serve};
pub use resolver::{Resolver, ResolverConfig};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
