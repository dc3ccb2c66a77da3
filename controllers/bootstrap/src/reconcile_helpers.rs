//! Helper functions shared by the Node and Cluster reconcilers
//!
//! Everything here is pure: finalizer and label edits report whether they
//! changed the object so callers only write when something moved.

use crate::error::ControllerError;
use crds::{API_GROUP, CLUSTER_NAME_LABEL, Cluster, Node};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use kube_runtime::reflector::ObjectRef;
use std::collections::BTreeSet;

pub fn has_finalizer<K: ResourceExt>(object: &K, finalizer: &str) -> bool {
    object.finalizers().iter().any(|f| f == finalizer)
}

/// Returns `true` if the finalizer was added
pub fn add_finalizer<K: ResourceExt>(object: &mut K, finalizer: &str) -> bool {
    if has_finalizer(object, finalizer) {
        return false;
    }
    object.finalizers_mut().push(finalizer.to_string());
    true
}

/// Returns `true` if the finalizer was present
pub fn remove_finalizer<K: ResourceExt>(object: &mut K, finalizer: &str) -> bool {
    let before = object.finalizers().len();
    object.finalizers_mut().retain(|f| f != finalizer);
    object.finalizers().len() != before
}

/// Returns `true` if the label changed
pub fn set_label<K: ResourceExt>(object: &mut K, key: &str, value: &str) -> bool {
    if object.labels().get(key).map(String::as_str) == Some(value) {
        return false;
    }
    object
        .labels_mut()
        .insert(key.to_string(), value.to_string());
    true
}

/// Returns `true` if the label was present
pub fn remove_label<K: ResourceExt>(object: &mut K, key: &str) -> bool {
    object.labels_mut().remove(key).is_some()
}

/// Sorted, de-duplicated names of `nodes`
pub fn member_names(nodes: &[Node]) -> Vec<String> {
    nodes
        .iter()
        .map(ResourceExt::name_any)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Difference between recorded and live membership
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub fn membership_diff(recorded: &[String], live: &[String]) -> MembershipDiff {
    let recorded: BTreeSet<&String> = recorded.iter().collect();
    let live: BTreeSet<&String> = live.iter().collect();

    MembershipDiff {
        added: live.difference(&recorded).map(|s| s.to_string()).collect(),
        removed: recorded.difference(&live).map(|s| s.to_string()).collect(),
    }
}

/// Make `owner` the controller reference of `node`.
///
/// Returns `Ok(true)` if the references changed. A node already controlled
/// by a different object is left alone and reported as
/// [`ControllerError::AlreadyOwned`].
pub fn upsert_controller_reference(
    node: &mut Node,
    owner: &OwnerReference,
) -> Result<bool, ControllerError> {
    let refs = node.owner_references_mut();

    if let Some(existing) = refs.iter().find(|r| r.controller == Some(true)) {
        if existing.uid != owner.uid {
            return Err(ControllerError::AlreadyOwned(format!(
                "node is controlled by {} {}",
                existing.kind, existing.name
            )));
        }
    }

    match refs.iter_mut().find(|r| r.uid == owner.uid) {
        Some(existing) if *existing == *owner => Ok(false),
        Some(existing) => {
            *existing = owner.clone();
            Ok(true)
        }
        None => {
            refs.push(owner.clone());
            Ok(true)
        }
    }
}

/// Whether the leader labels among `nodes` need a new election.
///
/// True when a labelled leader has no address, when several nodes carry the
/// label, or when nobody does although some node has an address.
pub fn needs_leader_election(nodes: &[Node]) -> bool {
    let leaders: Vec<&Node> = nodes.iter().filter(|n| n.is_leader()).collect();
    if leaders.len() > 1 || leaders.iter().any(|n| !n.has_static_address()) {
        return true;
    }
    leaders.is_empty() && nodes.iter().any(Node::has_static_address)
}

/// Drop every owner reference to `owner_uid`.
///
/// Returns `true` if a reference was removed.
pub fn release_owner_reference(node: &mut Node, owner_uid: &str) -> bool {
    let refs = node.owner_references_mut();
    let before = refs.len();
    refs.retain(|r| r.uid != owner_uid);
    refs.len() != before
}

/// Clusters a Node event should be routed to.
///
/// The cluster named by the `clusterName` label, plus the Cluster that
/// controls the node when that differs, so a cluster also hears about
/// members that left it.
pub fn clusters_for_node(node: &Node) -> Vec<ObjectRef<Cluster>> {
    let mut names: Vec<&str> = Vec::new();
    if let Some(cluster) = node.labels().get(CLUSTER_NAME_LABEL).filter(|c| !c.is_empty()) {
        names.push(cluster);
    }
    let controller = node.owner_references().iter().find(|r| {
        r.controller == Some(true)
            && r.kind == "Cluster"
            && r.api_version.split('/').next() == Some(API_GROUP)
    });
    if let Some(owner) = controller {
        if !names.contains(&owner.name.as_str()) {
            names.push(&owner.name);
        }
    }

    let namespace = node.namespace();
    names
        .into_iter()
        .map(|name| {
            let reference = ObjectRef::new(name);
            match &namespace {
                Some(ns) => reference.within(ns),
                None => reference,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "reconcile_helpers_test.rs"]
mod reconcile_helpers_test;
