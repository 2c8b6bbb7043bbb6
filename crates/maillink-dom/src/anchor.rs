//! Where controls go.
//!
//! An entity (a rendered message or a thread row) is any element carrying its
//! marker attribute. The control host is found by trying candidate CSS
//! selectors in order inside the entity; the first match wins and the entity
//! itself is the fallback.

use kuchiki::traits::*;
use kuchiki::{NodeRef, Selectors};
use serde::{Deserialize, Serialize};

use maillink_core::Request;

use crate::document::ElementExt;
use crate::error::{Error, Result};

/// The two kinds of decorated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// One rendered message.
    Message,
    /// A thread row; the link points at its newest message.
    Thread,
}

impl EntityKind {
    /// The link request for an entity of this kind with marker `reference`.
    #[must_use]
    pub fn request(self, reference: impl Into<String>) -> Request {
        match self {
            Self::Message => Request::Message {
                gmail_message_id: reference.into(),
            },
            Self::Thread => Request::ThreadLast {
                thread_id: reference.into(),
            },
        }
    }

    /// Lowercase name, as used in control attributes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Thread => "thread",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "message" => Some(Self::Message),
            "thread" => Some(Self::Thread),
            _ => None,
        }
    }
}

/// Whether the control goes into the matched region or its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Append to the matched element.
    #[default]
    Inside,
    /// Append to the matched element's parent.
    Parent,
}

/// One strategy in a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// CSS selector for the region to look for inside the entity.
    pub selector: String,
    /// Where the control goes relative to the match.
    #[serde(default)]
    pub placement: Placement,
}

impl Candidate {
    /// A candidate with [`Placement::Inside`].
    #[must_use]
    pub fn inside(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            placement: Placement::Inside,
        }
    }

    /// A candidate with [`Placement::Parent`].
    #[must_use]
    pub fn parent(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            placement: Placement::Parent,
        }
    }

    /// First element strictly inside `entity` matching the selector.
    fn region(&self, entity: &NodeRef) -> Option<NodeRef> {
        entity
            .select(&self.selector)
            .ok()?
            .map(|found| found.as_node().clone())
            .find(|found| found != entity)
    }
}

/// How to find and decorate one kind of entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRule {
    /// Entity kind.
    pub kind: EntityKind,
    /// Attribute whose presence marks an entity; its value is the reference.
    pub marker: String,
    /// Host regions, tried in order.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl EntityRule {
    /// All entities of this kind under `scope`, in document order.
    #[must_use]
    pub fn entities(&self, scope: &NodeRef) -> Vec<NodeRef> {
        scope
            .descendants()
            .elements()
            .filter(|element| element.attributes.borrow().contains(self.marker.as_str()))
            .map(|element| element.as_node().clone())
            .collect()
    }

    /// The entity's reference, if non-empty.
    #[must_use]
    pub fn reference(&self, entity: &NodeRef) -> Option<String> {
        let value = entity.attr(&self.marker)?;
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Element the control is appended to.
    #[must_use]
    pub fn host(&self, entity: &NodeRef) -> NodeRef {
        self.candidates
            .iter()
            .find_map(|candidate| {
                let region = candidate.region(entity)?;
                match candidate.placement {
                    Placement::Inside => Some(region),
                    Placement::Parent => region.parent(),
                }
            })
            .unwrap_or_else(|| entity.clone())
    }
}

/// The full set of anchoring rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRules {
    /// Rendered messages.
    pub message: EntityRule,
    /// Thread rows.
    pub thread: EntityRule,
    /// Class that marks an attached control.
    pub control_class: String,
}

impl AnchorRules {
    /// Rules in scan order: messages, then threads.
    #[must_use]
    pub fn rules(&self) -> [&EntityRule; 2] {
        [&self.message, &self.thread]
    }

    /// The rule for `kind`.
    #[must_use]
    pub const fn rule(&self, kind: EntityKind) -> &EntityRule {
        match kind {
            EntityKind::Message => &self.message,
            EntityKind::Thread => &self.thread,
        }
    }

    /// Checks that every candidate selector compiles.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSelector` naming the first one that does not.
    pub fn validate(&self) -> Result<()> {
        for candidate in self.rules().into_iter().flat_map(|rule| &rule.candidates) {
            Selectors::compile(&candidate.selector)
                .map_err(|()| Error::InvalidSelector(candidate.selector.clone()))?;
        }
        Ok(())
    }
}

impl Default for AnchorRules {
    /// Gmail's current markup: message header `.gH`/`.gE`, thread subject
    /// `.bog`/`.y6`.
    fn default() -> Self {
        Self {
            message: EntityRule {
                kind: EntityKind::Message,
                marker: "data-legacy-message-id".to_string(),
                candidates: vec![Candidate::inside(".gH"), Candidate::inside(".gE")],
            },
            thread: EntityRule {
                kind: EntityKind::Thread,
                marker: "data-legacy-thread-id".to_string(),
                candidates: vec![Candidate::parent(".bog"), Candidate::parent(".y6")],
            },
            control_class: "maillink-copy-link".to_string(),
        }
    }
}
