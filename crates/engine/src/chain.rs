//! Association chain walking and path rendering
//!
//! A mutated record's ownership chain (parent → … → root) locates the
//! change inside its aggregate:
//! - the chain runs root-first; `chain[0]` is the durable root whose id
//!   becomes the tracker entry's `record_id`
//! - the association path is the dot-joined type names of every node
//!   EXCEPT the root; it identifies the location inside the root
//!   aggregate, not the root itself, so a root-level change has an
//!   empty path

use chronicle_core::{AssociationNode, Trackable};

/// Walk a record's ownership chain, root first
///
/// Each node captures the record's type name and id, its best-effort
/// ordinal within the parent's collection at walk time (not stable
/// under concurrent reordering), and any transaction correlation id
/// stamped on the record.
pub fn traverse_association_chain(record: &dyn Trackable) -> Vec<AssociationNode> {
    let mut chain = match record.parent() {
        Some(parent) => traverse_association_chain(parent),
        None => Vec::new(),
    };
    chain.push(AssociationNode {
        type_name: record.type_name().to_string(),
        id: record.id(),
        index: record.position_in_parent(),
        transaction_id: record.transaction_id(),
    });
    chain
}

/// Render the dotted location of a chain's leaf inside its root aggregate
///
/// Root excluded, leaf included; empty when the record IS the root.
pub fn association_path(chain: &[AssociationNode]) -> String {
    chain
        .iter()
        .skip(1)
        .map(|node| node.type_name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}
