//! Idempotent control injection.

use kuchiki::NodeRef;
use kuchiki::traits::*;
use tracing::debug;

use maillink_core::Request;

use crate::anchor::{AnchorRules, EntityKind, EntityRule};
use crate::document::{Document, ElementExt, create_element};
use crate::error::Result;

const KIND_ATTR: &str = "data-maillink-kind";
const REF_ATTR: &str = "data-maillink-ref";

/// A control attached by one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedControl {
    /// The control element.
    pub control: NodeRef,
    /// Where it was appended.
    pub host: NodeRef,
    /// The decorated entity.
    pub entity: NodeRef,
    /// Entity kind.
    pub kind: EntityKind,
    /// What activating the control asks for.
    pub request: Request,
}

/// Attaches one copy-link control per entity.
#[derive(Debug, Clone, Default)]
pub struct Injector {
    rules: AnchorRules,
}

impl Injector {
    /// Creates an injector with the given rules.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSelector` if a candidate selector does not compile.
    pub fn new(rules: AnchorRules) -> Result<Self> {
        rules.validate()?;
        Ok(Self { rules })
    }

    /// The anchoring rules.
    #[must_use]
    pub const fn rules(&self) -> &AnchorRules {
        &self.rules
    }

    /// Decorates every undecorated entity in the document and returns the
    /// controls attached by this pass. An entity already holding a control
    /// of its kind is left alone, so repeated scans are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree rejects an insertion.
    pub fn scan(&self, document: &mut Document) -> Result<Vec<InjectedControl>> {
        let root = document.root().clone();
        let mut injected = Vec::new();

        for rule in self.rules.rules() {
            for entity in rule.entities(&root) {
                if self.is_decorated(rule.kind, &entity) {
                    continue;
                }
                let Some(reference) = rule.reference(&entity) else {
                    debug!(kind = rule.kind.as_str(), "entity without reference skipped");
                    continue;
                };
                injected.push(self.attach(document, rule, entity, reference)?);
            }
        }

        debug!(injected = injected.len(), "scan complete");
        Ok(injected)
    }

    /// Reads back the request a control was created for.
    #[must_use]
    pub fn request_for(&self, control: &NodeRef) -> Option<Request> {
        if !control.has_class(&self.rules.control_class) {
            return None;
        }
        let kind = EntityKind::from_name(&control.attr(KIND_ATTR)?)?;
        Some(kind.request(control.attr(REF_ATTR)?))
    }

    fn is_decorated(&self, kind: EntityKind, entity: &NodeRef) -> bool {
        entity.descendants().elements().any(|element| {
            let control = element.as_node();
            control.has_class(&self.rules.control_class)
                && control.attr(KIND_ATTR).as_deref() == Some(kind.as_str())
        })
    }

    fn attach(
        &self,
        document: &mut Document,
        rule: &EntityRule,
        entity: NodeRef,
        reference: String,
    ) -> Result<InjectedControl> {
        let host = rule.host(&entity);
        let control = create_element("button");
        control.set_attr("class", &self.rules.control_class);
        control.set_attr("type", "button");
        control.set_attr(KIND_ATTR, rule.kind.as_str());
        control.set_attr(REF_ATTR, &reference);
        control.set_attr("title", title(rule.kind));
        document.append(&host, control.clone())?;

        Ok(InjectedControl {
            control,
            host,
            entity,
            kind: rule.kind,
            request: rule.kind.request(reference),
        })
    }
}

const fn title(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Message => "Copy link to this message",
        EntityKind::Thread => "Copy link to the latest message",
    }
}
