//! Cluster reconciler
//!
//! Phases: `""` (IdentifyNodes) -> `ElectLeader` -> `PatchNodes` ->
//! `Nodesubmitted` (ReconcileNodes). Membership is always recomputed from
//! the `clusterName` label, never cached.

use super::{PHASE_REQUEUE, Reconciler};
use crate::error::ControllerError;
use crate::reconcile_helpers::{
    member_names, membership_diff, needs_leader_election, release_owner_reference, remove_label,
    set_label, upsert_controller_reference,
};
use crate::store::object_key;
use crds::{
    CLUSTER_NAME_LABEL, Cluster, ClusterPhase, LABEL_TRUE, LEADER_LABEL, Node, READY_LABEL,
};
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use tracing::{debug, info, warn};

impl Reconciler {
    /// One reconcile pass for a Cluster
    pub async fn reconcile_cluster(&self, cluster: &Cluster) -> Result<Action, ControllerError> {
        let namespace = cluster.namespace().unwrap_or_default();
        let name = cluster.name_any();

        let Some(cluster) = self.clusters.get(&namespace, &name).await? else {
            debug!("Cluster {}/{} no longer exists", namespace, name);
            return Ok(Action::await_change());
        };

        if cluster.metadata.deletion_timestamp.is_some() {
            debug!("Cluster {} is being deleted", object_key(&cluster));
            return Ok(Action::await_change());
        }

        match cluster.phase() {
            ClusterPhase::Pending => self.identify_nodes(cluster).await,
            ClusterPhase::ElectLeader => self.elect_leader(cluster).await,
            ClusterPhase::PatchNodes => self.patch_nodes(cluster).await,
            ClusterPhase::NodeSubmitted => self.reconcile_members(cluster).await,
        }
    }

    async fn list_members(&self, cluster: &Cluster) -> Result<Vec<Node>, ControllerError> {
        let name = cluster.name_any();
        self.nodes
            .list(cluster.namespace().as_deref(), &[(CLUSTER_NAME_LABEL, &name)])
            .await
    }

    async fn set_cluster_phase(
        &self,
        mut cluster: Cluster,
        phase: ClusterPhase,
    ) -> Result<(), ControllerError> {
        let status = cluster.status.get_or_insert_with(Default::default);
        let from = status.phase;
        status.phase = phase;
        status.message.clear();
        self.clusters.update(&cluster).await?;
        info!("Cluster {}: {} -> {}", object_key(&cluster), from, phase);
        Ok(())
    }

    /// `""`: record the label-selected member set
    async fn identify_nodes(&self, mut cluster: Cluster) -> Result<Action, ControllerError> {
        let members = member_names(&self.list_members(&cluster).await?);
        let next = if members.is_empty() {
            ClusterPhase::NodeSubmitted
        } else {
            ClusterPhase::ElectLeader
        };

        info!(
            "Cluster {} has {} member(s): {:?}",
            object_key(&cluster),
            members.len(),
            members
        );
        cluster.status.get_or_insert_with(Default::default).members = members;
        self.set_cluster_phase(cluster, next).await?;
        Ok(Action::requeue(PHASE_REQUEUE))
    }

    /// `ElectLeader`: keep one valid leader or promote the smallest candidate
    async fn elect_leader(&self, cluster: Cluster) -> Result<Action, ControllerError> {
        let namespace = cluster.namespace().unwrap_or_default();
        let mut members = cluster.members().to_vec();
        members.sort();
        members.dedup();

        let mut leader: Option<String> = None;
        let mut candidates: Vec<Node> = Vec::new();

        for member in &members {
            let Some(mut node) = self.nodes.get(&namespace, member).await? else {
                warn!("Member {}/{} of cluster {} not found", namespace, member, cluster.name_any());
                continue;
            };
            let addressed = node.has_static_address();

            if node.is_leader() {
                if addressed && leader.is_none() {
                    leader = Some(member.clone());
                    continue;
                }
                warn!(
                    "Removing stale leader label from Node {} (address set: {})",
                    object_key(&node),
                    addressed
                );
                remove_label(&mut node, LEADER_LABEL);
                node = self.nodes.update(&node).await?;
            }

            if addressed {
                candidates.push(node);
            }
        }

        match leader {
            Some(leader) => {
                debug!("Cluster {} keeps leader {}", object_key(&cluster), leader);
            }
            None => {
                // Members are sorted, so the first candidate has the smallest name
                let Some(mut elected) = candidates.into_iter().next() else {
                    return Err(ControllerError::NoLeaderCandidate(object_key(&cluster)));
                };
                set_label(&mut elected, LEADER_LABEL, LABEL_TRUE);
                self.nodes.update(&elected).await?;
                info!(
                    "Cluster {} elected leader {}",
                    object_key(&cluster),
                    elected.name_any()
                );
            }
        }

        self.set_cluster_phase(cluster, ClusterPhase::PatchNodes).await?;
        Ok(Action::requeue(PHASE_REQUEUE))
    }

    /// `PatchNodes`: push cluster settings onto every member
    async fn patch_nodes(&self, cluster: Cluster) -> Result<Action, ControllerError> {
        let namespace = cluster.namespace().unwrap_or_default();
        let owner = cluster.controller_owner_ref(&()).ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "Cluster {} has no uid yet",
                object_key(&cluster)
            ))
        })?;

        for member in cluster.members() {
            let Some(mut node) = self.nodes.get(&namespace, member).await? else {
                warn!("Member {}/{} of cluster {} not found", namespace, member, cluster.name_any());
                continue;
            };

            let mut changed = node.spec.apply_cluster_settings(&cluster.spec);
            changed |= set_label(&mut node, READY_LABEL, LABEL_TRUE);
            changed |= upsert_controller_reference(&mut node, &owner)?;

            if changed {
                self.nodes.update(&node).await?;
                info!("Patched Node {} with cluster settings", object_key(&node));
            } else {
                debug!("Node {} already up to date", object_key(&node));
            }
        }

        self.set_cluster_phase(cluster, ClusterPhase::NodeSubmitted)
            .await?;
        Ok(Action::requeue(PHASE_REQUEUE))
    }

    /// Undo what PatchNodes put on nodes that left the cluster.
    ///
    /// Only nodes still controlled by this cluster are touched, so a node
    /// already adopted elsewhere keeps its new labels.
    async fn release_members(&self, cluster: &Cluster, removed: &[String]) -> Result<(), ControllerError> {
        let namespace = cluster.namespace().unwrap_or_default();
        let Some(uid) = cluster.uid() else {
            return Ok(());
        };

        for member in removed {
            let Some(mut node) = self.nodes.get(&namespace, member).await? else {
                continue;
            };
            if !release_owner_reference(&mut node, &uid) {
                continue;
            }
            remove_label(&mut node, READY_LABEL);
            remove_label(&mut node, LEADER_LABEL);
            match self.nodes.update(&node).await {
                Ok(_) | Err(ControllerError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            info!(
                "Released Node {} from cluster {}",
                object_key(&node),
                cluster.name_any()
            );
        }
        Ok(())
    }

    /// `Nodesubmitted`: follow membership and leader drift
    async fn reconcile_members(&self, mut cluster: Cluster) -> Result<Action, ControllerError> {
        let nodes = self.list_members(&cluster).await?;
        let live = member_names(&nodes);
        let diff = membership_diff(cluster.members(), &live);

        if diff.is_empty() {
            if needs_leader_election(&nodes) {
                info!("Cluster {} leader labels drifted, re-electing", object_key(&cluster));
                self.set_cluster_phase(cluster, ClusterPhase::ElectLeader)
                    .await?;
                return Ok(Action::requeue(PHASE_REQUEUE));
            }
            debug!("Cluster {} membership unchanged", object_key(&cluster));
            return Ok(Action::await_change());
        }

        if !diff.removed.is_empty() {
            info!("Cluster {} lost member(s): {:?}", object_key(&cluster), diff.removed);
            self.release_members(&cluster, &diff.removed).await?;
        }
        cluster.status.get_or_insert_with(Default::default).members = live;

        if diff.added.is_empty() {
            self.clusters.update(&cluster).await?;
        } else {
            info!("Cluster {} gained member(s): {:?}", object_key(&cluster), diff.added);
            self.set_cluster_phase(cluster, ClusterPhase::Pending).await?;
        }
        Ok(Action::requeue(PHASE_REQUEUE))
    }
}
