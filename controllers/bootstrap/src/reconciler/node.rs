//! Node reconciler
//!
//! Phases: `""` -> `uidgenerated` -> `hardwarepushed` (terminal), plus the
//! deletion branch which removes the hardware record before releasing the
//! finalizer.

use super::{PHASE_REQUEUE, Reconciler};
use crate::error::ControllerError;
use crate::hardware_record::build_hardware_record;
use crate::reconcile_helpers::{add_finalizer, has_finalizer, remove_finalizer, set_label};
use crate::server_url::{config_url, resolve_server_url};
use crate::store::object_key;
use crds::{FINALIZER, Node, NodePhase, UUID_LABEL};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::{debug, info};

impl Reconciler {
    /// One reconcile pass for a Node
    pub async fn reconcile_node(&self, node: &Node) -> Result<Action, ControllerError> {
        let namespace = node.namespace().unwrap_or_default();
        let name = node.name_any();

        let Some(node) = self.nodes.get(&namespace, &name).await? else {
            debug!("Node {}/{} no longer exists", namespace, name);
            return Ok(Action::await_change());
        };

        if node.metadata.deletion_timestamp.is_some() {
            return self.finalize_node(node).await;
        }

        match node.phase() {
            NodePhase::Pending => self.assign_uuid(node).await,
            NodePhase::UidGenerated => self.push_hardware(node).await,
            NodePhase::HardwarePushed => {
                debug!("Node {} already registered", object_key(&node));
                Ok(Action::await_change())
            }
        }
    }

    /// `""`: finalizer + UUID, no external calls
    async fn assign_uuid(&self, mut node: Node) -> Result<Action, ControllerError> {
        add_finalizer(&mut node, FINALIZER);

        let (uuid, adopted) = match node.uuid() {
            Some(existing) => (existing.to_string(), true),
            None => (uuid::Uuid::new_v4().to_string(), false),
        };
        set_label(&mut node, UUID_LABEL, &uuid);

        let status = node.status.get_or_insert_with(Default::default);
        status.uuid = uuid.clone();
        status.phase = NodePhase::UidGenerated;
        status.message.clear();

        self.nodes.update(&node).await?;
        if adopted {
            info!("Node {} adopted existing uuid {}", object_key(&node), uuid);
        } else {
            info!("Node {} assigned uuid {}", object_key(&node), uuid);
        }
        Ok(Action::requeue(PHASE_REQUEUE))
    }

    /// `uidgenerated`: register the hardware record
    async fn push_hardware(&self, mut node: Node) -> Result<Action, ControllerError> {
        // The record must never exist without the finalizer guarding it
        if add_finalizer(&mut node, FINALIZER) {
            self.nodes.update(&node).await?;
            return Ok(Action::requeue(PHASE_REQUEUE));
        }

        let server_url = resolve_server_url(self.nodes.as_ref(), &self.settings, &node).await?;
        let uuid = node.uuid().unwrap_or_default().to_string();
        let callback = config_url(&self.settings, &server_url, &uuid)?;
        let record = build_hardware_record(&node, &callback)?;

        self.hardware
            .push(&record)
            .await
            .map_err(|e| ControllerError::hardware("push", e))?;

        let status = node.status.get_or_insert_with(Default::default);
        status.phase = NodePhase::HardwarePushed;
        status.hardware_published = true;
        status.message.clear();

        self.nodes.update(&node).await?;
        info!(
            "Node {} registered with hardware service as {}",
            object_key(&node),
            record.id
        );
        Ok(Action::requeue(PHASE_REQUEUE))
    }

    /// Deletion: remove the remote record, then release the finalizer
    async fn finalize_node(&self, mut node: Node) -> Result<Action, ControllerError> {
        if !has_finalizer(&node, FINALIZER) {
            return Ok(Action::await_change());
        }

        if let Some(uuid) = node.uuid().map(str::to_string) {
            match self.hardware.lookup(&uuid).await {
                Ok(_) => match self.hardware.delete(&uuid).await {
                    Ok(()) => info!("Deleted hardware record {}", uuid),
                    Err(e) if e.is_not_found() => {
                        debug!("Hardware record {} vanished before delete", uuid)
                    }
                    Err(e) => return Err(ControllerError::hardware("delete", e)),
                },
                Err(e) if e.is_not_found() => debug!("No hardware record {} to delete", uuid),
                Err(e) => return Err(ControllerError::hardware("lookup", e)),
            }
        }

        remove_finalizer(&mut node, FINALIZER);
        match self.nodes.update(&node).await {
            Ok(_) | Err(ControllerError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        info!("Released finalizer on Node {}", object_key(&node));
        Ok(Action::await_change())
    }
}
