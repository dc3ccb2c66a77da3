//! Hardware record construction for a Node.

use crate::error::ControllerError;
use crate::store::object_key;
use crds::{Node, UUID_LABEL};
use hardware_client::{
    Dhcp, DhcpIp, Hardware, HardwareNetwork, Metadata, Netboot, NetworkInterface, Osie,
};
use kube::ResourceExt;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Build the record registered for `node`, pointing its installer at `config_url`.
///
/// A static lease is only included when address, gateway and netmask are
/// all set; otherwise the node boots with plain DHCP.
pub fn build_hardware_record(node: &Node, config_url: &str) -> Result<Hardware, ControllerError> {
    let uuid = node.uuid().ok_or_else(|| {
        ControllerError::MissingLabel(format!("{} on Node {}", UUID_LABEL, object_key(node)))
    })?;
    let spec = &node.spec;

    let ip = match (
        non_empty(&spec.address),
        non_empty(&spec.gateway),
        non_empty(&spec.netmask),
    ) {
        (Some(address), Some(gateway), Some(netmask)) => Some(DhcpIp {
            address: address.to_string(),
            gateway: gateway.to_string(),
            netmask: netmask.to_string(),
        }),
        _ => None,
    };

    let interface = NetworkInterface {
        dhcp: Dhcp {
            mac: spec.mac_address.clone(),
            hostname: node.name_any(),
            iface_name: spec.interface.clone(),
            ip,
        },
        netboot: Netboot {
            allow_pxe: true,
            osie: non_empty(&spec.pxe_iso_url).map(|url| Osie {
                base_url: url.to_string(),
            }),
        },
    };

    Ok(Hardware {
        id: uuid.to_string(),
        metadata: serde_json::to_string(&Metadata::for_config_url(config_url))?,
        network: HardwareNetwork {
            interfaces: vec![interface],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_node;

    #[test]
    fn test_dhcp_record() {
        let mut node = test_node("n1", Some("c1"), None);
        node.labels_mut()
            .insert(UUID_LABEL.to_string(), "u1".to_string());

        let hw = build_hardware_record(&node, "http://10.0.0.1:30880/config/u1").unwrap();
        assert_eq!(hw.id, "u1");
        let iface = &hw.network.interfaces[0];
        assert_eq!(iface.dhcp.hostname, "n1");
        assert_eq!(iface.dhcp.mac, node.spec.mac_address);
        assert_eq!(iface.dhcp.iface_name, "eth0");
        assert!(iface.dhcp.ip.is_none());
        assert!(iface.netboot.allow_pxe);
        assert!(iface.netboot.osie.is_none());
        assert_eq!(
            hw.metadata().unwrap().config_url(),
            Some("http://10.0.0.1:30880/config/u1")
        );
    }

    #[test]
    fn test_static_lease_needs_all_three() {
        let mut node = test_node("n1", Some("c1"), Some("10.0.0.5"));
        node.labels_mut()
            .insert(UUID_LABEL.to_string(), "u1".to_string());
        node.spec.gateway = Some("10.0.0.1".to_string());

        let hw = build_hardware_record(&node, "http://h:1/config/u1").unwrap();
        assert!(hw.network.interfaces[0].dhcp.ip.is_none());

        node.spec.netmask = Some("255.255.255.0".to_string());
        node.spec.pxe_iso_url = Some("http://mirror/boot".to_string());
        let hw = build_hardware_record(&node, "http://h:1/config/u1").unwrap();
        let iface = &hw.network.interfaces[0];
        assert_eq!(
            iface.dhcp.ip,
            Some(DhcpIp {
                address: "10.0.0.5".to_string(),
                gateway: "10.0.0.1".to_string(),
                netmask: "255.255.255.0".to_string(),
            })
        );
        assert_eq!(
            iface.netboot.osie.as_ref().map(|o| o.base_url.as_str()),
            Some("http://mirror/boot")
        );
    }

    #[test]
    fn test_missing_uuid_is_error() {
        let node = test_node("n1", Some("c1"), None);
        let err = build_hardware_record(&node, "http://h:1/config/x").unwrap_err();
        assert!(matches!(err, ControllerError::MissingLabel(_)));
    }
}
