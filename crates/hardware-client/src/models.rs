//! Hardware record models
//!
//! Wire shape of a hardware record as accepted by the registration service.
//! The `metadata` field is itself a JSON document carried as a string.

use serde::{Deserialize, Serialize};

/// Facility code written into every record's metadata
pub const FACILITY_CODE: &str = "onprem";

/// Operating system slug understood by the provisioning workflows
pub const OS_SLUG: &str = "harvester_0_2_0";

/// Kernel argument prefix the installer reads its config URL from
pub const CONFIG_URL_USERDATA_PREFIX: &str = "harvester.install.config_url=";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hardware {
    /// Node UUID
    pub id: String,

    /// Serialized [`Metadata`]
    #[serde(default)]
    pub metadata: String,

    pub network: HardwareNetwork,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HardwareNetwork {
    #[serde(default)]
    pub interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NetworkInterface {
    pub dhcp: Dhcp,
    pub netboot: Netboot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Dhcp {
    pub mac: String,

    pub hostname: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iface_name: String,

    /// Static lease; absent means plain DHCP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<DhcpIp>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DhcpIp {
    pub address: String,
    pub gateway: String,
    pub netmask: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Netboot {
    pub allow_pxe: bool,

    /// Non-default location of the boot artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osie: Option<Osie>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Osie {
    pub base_url: String,
}

/// Metadata document embedded in a record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    pub facility: Facility,
    pub instance: Instance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Facility {
    pub facility_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instance {
    pub userdata: String,
    pub operating_system: OperatingSystem,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatingSystem {
    pub slug: String,
}

impl Metadata {
    /// Metadata pointing the installer at `config_url`
    pub fn for_config_url(config_url: &str) -> Self {
        Self {
            facility: Facility {
                facility_code: FACILITY_CODE.to_string(),
            },
            instance: Instance {
                userdata: format!("{}{}", CONFIG_URL_USERDATA_PREFIX, config_url),
                operating_system: OperatingSystem {
                    slug: OS_SLUG.to_string(),
                },
            },
        }
    }

    /// Config URL carried in the userdata, if any
    pub fn config_url(&self) -> Option<&str> {
        self.instance
            .userdata
            .strip_prefix(CONFIG_URL_USERDATA_PREFIX)
    }
}

impl Hardware {
    pub fn metadata(&self) -> Result<Metadata, serde_json::Error> {
        serde_json::from_str(&self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_document_shape() {
        let md = Metadata::for_config_url("http://10.0.0.1:30880/config/abc");
        assert_eq!(
            serde_json::to_value(&md).unwrap(),
            json!({
                "facility": {"facility_code": "onprem"},
                "instance": {
                    "userdata": "harvester.install.config_url=http://10.0.0.1:30880/config/abc",
                    "operating_system": {"slug": "harvester_0_2_0"}
                }
            })
        );
        assert_eq!(md.config_url(), Some("http://10.0.0.1:30880/config/abc"));
    }

    #[test]
    fn test_dhcp_without_static_ip_omits_ip() {
        let dhcp = Dhcp {
            mac: "aa:bb:cc:dd:ee:ff".to_string(),
            hostname: "n1".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&dhcp).unwrap();
        assert!(value.get("ip").is_none());
        assert!(value.get("iface_name").is_none());
    }

    #[test]
    fn test_hardware_metadata_parse() {
        let md = Metadata::for_config_url("http://h:1/config/u");
        let hw = Hardware {
            id: "u".to_string(),
            metadata: serde_json::to_string(&md).unwrap(),
            network: HardwareNetwork::default(),
        };
        assert_eq!(hw.metadata().unwrap(), md);
    }
}
