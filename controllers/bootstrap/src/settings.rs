//! Controller settings loaded from environment variables.

use crate::error::ControllerError;
use std::env;

/// Default port of the config endpoint (exposed as a NodePort)
pub const DEFAULT_CONFIG_PORT: u16 = 30880;

/// Port of the kube-apiserver on the cluster leader
pub const API_SERVER_PORT: u16 = 6443;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the hardware registration service
    pub hardware_url: String,
    pub hardware_token: Option<String>,
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Fixed management-plane URL (standalone mode)
    pub server_url: Option<String>,
    /// Host written into config callback URLs instead of the leader host
    pub config_host: Option<String>,
    pub config_port: u16,
    pub config_url_scheme: String,
    pub harvester_version: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let hardware_url = get("HARDWARE_URL").ok_or_else(|| {
            ControllerError::InvalidConfig(
                "HARDWARE_URL environment variable is required".to_string(),
            )
        })?;

        let config_port = match get("CONFIG_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                ControllerError::InvalidConfig(format!("CONFIG_PORT '{}' is not a port: {}", raw, e))
            })?,
            None => DEFAULT_CONFIG_PORT,
        };

        let config_url_scheme = get("CONFIG_URL_SCHEME").unwrap_or_else(|| "http".to_string());
        if config_url_scheme != "http" && config_url_scheme != "https" {
            return Err(ControllerError::InvalidConfig(format!(
                "CONFIG_URL_SCHEME must be http or https, got '{}'",
                config_url_scheme
            )));
        }

        Ok(Self {
            hardware_url,
            hardware_token: get("HARDWARE_TOKEN"),
            namespace: get("WATCH_NAMESPACE"),
            server_url: get("SERVER_URL"),
            config_host: get("CONFIG_HOST"),
            config_port,
            config_url_scheme,
            harvester_version: get("HARVESTER_VERSION").unwrap_or_else(|| "master".to_string()),
        })
    }

    pub fn install_options(&self) -> config_server::InstallOptions {
        config_server::InstallOptions {
            harvester_version: self.harvester_version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[("HARDWARE_URL", "http://tink:42113")])).unwrap();
        assert_eq!(settings.hardware_url, "http://tink:42113");
        assert_eq!(settings.config_port, 30880);
        assert_eq!(settings.config_url_scheme, "http");
        assert_eq!(settings.harvester_version, "master");
        assert!(settings.namespace.is_none());
        assert!(settings.server_url.is_none());
    }

    #[test]
    fn test_missing_hardware_url_is_fatal() {
        let err = Settings::from_lookup(lookup(&[("HARDWARE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("HARDWARE_URL", "http://tink"),
            ("HARDWARE_TOKEN", "t"),
            ("WATCH_NAMESPACE", "harvester"),
            ("SERVER_URL", "https://10.0.0.9:6443"),
            ("CONFIG_PORT", "8080"),
            ("CONFIG_URL_SCHEME", "https"),
            ("HARVESTER_VERSION", "v1.0.0"),
        ]))
        .unwrap();
        assert_eq!(settings.hardware_token.as_deref(), Some("t"));
        assert_eq!(settings.namespace.as_deref(), Some("harvester"));
        assert_eq!(settings.server_url.as_deref(), Some("https://10.0.0.9:6443"));
        assert_eq!(settings.config_port, 8080);
        assert_eq!(settings.config_url_scheme, "https");
        assert_eq!(settings.install_options().harvester_version, "v1.0.0");
    }

    #[test]
    fn test_bad_port_rejected() {
        let err = Settings::from_lookup(lookup(&[("HARDWARE_URL", "http://tink"), ("CONFIG_PORT", "99999")]))
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }
}
