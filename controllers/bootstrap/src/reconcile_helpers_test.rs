//! Unit tests for reconcile_helpers module

use super::*;
use crate::test_utils::{test_cluster, test_node};
use crds::{LABEL_TRUE, LEADER_LABEL};
use kube::Resource;

fn owner(uid: &str) -> OwnerReference {
    let mut cluster = test_cluster("c1");
    cluster.metadata.uid = Some(uid.to_string());
    cluster.controller_owner_ref(&()).unwrap()
}

fn leader(name: &str, address: Option<&str>) -> Node {
    let mut node = test_node(name, Some("c1"), address);
    node.labels_mut()
        .insert(LEADER_LABEL.to_string(), LABEL_TRUE.to_string());
    node
}

#[test]
fn test_finalizer_add_remove() {
    let mut node = test_node("n1", None, None);
    assert!(add_finalizer(&mut node, "f"));
    assert!(!add_finalizer(&mut node, "f"));
    assert!(has_finalizer(&node, "f"));
    assert_eq!(node.finalizers().len(), 1);

    assert!(remove_finalizer(&mut node, "f"));
    assert!(!remove_finalizer(&mut node, "f"));
    assert!(!has_finalizer(&node, "f"));
}

#[test]
fn test_set_label_reports_change() {
    let mut node = test_node("n1", None, None);
    assert!(set_label(&mut node, "ready", "true"));
    assert!(!set_label(&mut node, "ready", "true"));
    assert!(set_label(&mut node, "ready", "false"));
    assert!(remove_label(&mut node, "ready"));
    assert!(!remove_label(&mut node, "ready"));
}

#[test]
fn test_member_names_sorted_and_unique() {
    let nodes = vec![
        test_node("n2", Some("c1"), None),
        test_node("n1", Some("c1"), None),
        test_node("n2", Some("c1"), None),
    ];
    assert_eq!(member_names(&nodes), vec!["n1".to_string(), "n2".to_string()]);
}

#[test]
fn test_membership_diff() {
    let recorded = vec!["a".to_string(), "b".to_string()];
    let live = vec!["b".to_string(), "c".to_string()];
    let diff = membership_diff(&recorded, &live);
    assert_eq!(diff.added, vec!["c".to_string()]);
    assert_eq!(diff.removed, vec!["a".to_string()]);
    assert!(!diff.is_empty());
    assert!(membership_diff(&live, &live).is_empty());
}

#[test]
fn test_upsert_controller_reference() {
    let mut node = test_node("n1", Some("c1"), None);
    let owner = owner("uid-c1");

    assert!(upsert_controller_reference(&mut node, &owner).unwrap());
    assert!(!upsert_controller_reference(&mut node, &owner).unwrap());
    assert_eq!(node.owner_references().len(), 1);
    assert_eq!(node.owner_references()[0].controller, Some(true));

    let err = upsert_controller_reference(&mut node, &self::owner("uid-other")).unwrap_err();
    assert!(matches!(err, ControllerError::AlreadyOwned(_)));
}

#[test]
fn test_needs_leader_election() {
    // no addresses anywhere: nothing to elect
    assert!(!needs_leader_election(&[test_node("n1", Some("c1"), None)]));
    // candidate but no leader
    assert!(needs_leader_election(&[test_node("n1", Some("c1"), Some("10.0.0.1"))]));
    // one valid leader
    assert!(!needs_leader_election(&[
        leader("n1", Some("10.0.0.1")),
        test_node("n2", Some("c1"), Some("10.0.0.2")),
    ]));
    // leader lost its address
    assert!(needs_leader_election(&[
        leader("n1", None),
        test_node("n2", Some("c1"), Some("10.0.0.2")),
    ]));
    // two leaders
    assert!(needs_leader_election(&[
        leader("n1", Some("10.0.0.1")),
        leader("n2", Some("10.0.0.2")),
    ]));
}

#[test]
fn test_clusters_for_node_by_label() {
    let node = test_node("n1", Some("c1"), None);
    let references = clusters_for_node(&node);
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].name, "c1");
    assert_eq!(references[0].namespace.as_deref(), Some("default"));

    assert!(clusters_for_node(&test_node("n2", None, None)).is_empty());
    assert!(clusters_for_node(&test_node("n3", Some(""), None)).is_empty());
}

#[test]
fn test_clusters_for_node_includes_previous_owner() {
    let mut node = test_node("n1", Some("c2"), None);
    node.owner_references_mut().push(owner("uid-c1"));

    let names: Vec<String> = clusters_for_node(&node)
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["c2".to_string(), "c1".to_string()]);

    // Owner and label agree: one entry
    let mut node = test_node("n1", Some("c1"), None);
    node.owner_references_mut().push(owner("uid-c1"));
    assert_eq!(clusters_for_node(&node).len(), 1);

    // Label removed: the owner still hears about it
    let mut node = test_node("n1", None, None);
    node.owner_references_mut().push(owner("uid-c1"));
    assert_eq!(clusters_for_node(&node)[0].name, "c1");
}

#[test]
fn test_release_owner_reference() {
    let mut node = test_node("n1", Some("c1"), None);
    node.owner_references_mut().push(owner("uid-c1"));

    assert!(!release_owner_reference(&mut node, "uid-other"));
    assert!(release_owner_reference(&mut node, "uid-c1"));
    assert!(node.owner_references().is_empty());
    assert!(!release_owner_reference(&mut node, "uid-c1"));
}
