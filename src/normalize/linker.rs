use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::builder::NodeSet;
use super::label::clean_label;
use super::raw::{Endpoint, RawGraphElement};
use crate::models::Link;

pub const FALLBACK_LINK_TYPE: &str = "RELATED_TO";

#[derive(Debug, Default)]
pub struct LinkOutcome {
    pub links: Vec<Link>,
    /// Relationships with an endpoint that did not resolve to a node.
    pub dropped: usize,
    pub duplicates: usize,
}

/// Build links from raw relationships. A link is emitted only when both
/// endpoints resolve to nodes in `nodes`; ids are unique across the output.
pub fn link_relationships(relationships: &[RawGraphElement], nodes: &NodeSet) -> LinkOutcome {
    let mut outcome = LinkOutcome::default();
    let mut seen = HashSet::new();

    for rel in relationships {
        let source = rel.endpoint(Endpoint::Start);
        let target = rel.endpoint(Endpoint::End);
        let resolved = source
            .as_deref()
            .and_then(|s| nodes.resolve(s))
            .zip(target.as_deref().and_then(|t| nodes.resolve(t)));

        let Some((source, target)) = resolved else {
            debug!(
                "Dropping relationship {:?} -> {:?}: endpoint not in node set",
                source, target
            );
            outcome.dropped += 1;
            continue;
        };

        let id = match rel.relationship_id() {
            Some(id) => format!("link-{}", id),
            None => format!("link-{}", Uuid::new_v4().simple()),
        };
        if !seen.insert(id.clone()) {
            outcome.duplicates += 1;
            continue;
        }

        let link_type = rel
            .rel_type
            .as_ref()
            .and_then(|t| t.as_str())
            .map(clean_label)
            .filter(|t| !t.is_empty())
            .unwrap_or(FALLBACK_LINK_TYPE);

        let mut link = Link::new(id, source, target, link_type);
        link.properties = rel.properties.clone().filter(|props| !props.is_empty());
        outcome.links.push(link);
    }

    outcome
}
