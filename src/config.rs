use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use tracing::warn;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub fleet: FleetConfig,
    pub limits: PackingLimits,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&env_string)
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig::from_lookup(lookup),
            fleet: FleetConfig::from_lookup(lookup),
            limits: PackingLimits::from_lookup(lookup),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
    docs_enabled: bool,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "TRUCKLOAD_API_HOST";
    const PORT_VAR: &'static str = "TRUCKLOAD_API_PORT";
    const DOCS_VAR: &'static str = "TRUCKLOAD_ENABLE_DOCS";

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let host_value = lookup(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match lookup(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        let docs_enabled = lookup(Self::DOCS_VAR)
            .and_then(|raw| parse_bool(&raw, Self::DOCS_VAR))
            .unwrap_or(true);

        Self {
            bind_ip,
            display_host: effective_host,
            port,
            docs_enabled,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether `/docs` and `/docs/openapi.json` are served.
    pub fn docs_enabled(&self) -> bool {
        self.docs_enabled
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Where additional or customized trucks come from.
#[derive(Clone, Debug, Default)]
pub struct FleetConfig {
    file: Option<PathBuf>,
}

impl FleetConfig {
    const FILE_VAR: &'static str = "TRUCKLOAD_FLEET_FILE";

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            file: lookup(Self::FILE_VAR).map(PathBuf::from),
        }
    }

    /// JSON file with fleet overrides, if configured.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// Request-level limits around the packing engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackingLimits {
    /// Maximum number of units (quantities expanded) per request
    pub max_units: usize,
    /// Capacity of the event channel behind `/pack_stream`
    pub stream_buffer: usize,
}

impl PackingLimits {
    pub const DEFAULT_MAX_UNITS: usize = 2000;
    pub const DEFAULT_STREAM_BUFFER: usize = 32;
    const MAX_UNITS_VAR: &'static str = "TRUCKLOAD_MAX_UNITS";
    const STREAM_BUFFER_VAR: &'static str = "TRUCKLOAD_STREAM_BUFFER";

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let max_units = load_usize_with_warning(
            lookup,
            Self::MAX_UNITS_VAR,
            Self::DEFAULT_MAX_UNITS,
            |value| value > 0,
            "must be greater than 0",
        );
        let stream_buffer = load_usize_with_warning(
            lookup,
            Self::STREAM_BUFFER_VAR,
            Self::DEFAULT_STREAM_BUFFER,
            |value| value > 0,
            "must be greater than 0",
        );

        Self {
            max_units,
            stream_buffer,
        }
    }
}

impl Default for PackingLimits {
    fn default() -> Self {
        Self {
            max_units: Self::DEFAULT_MAX_UNITS,
            stream_buffer: Self::DEFAULT_STREAM_BUFFER,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("⚠️ Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_usize_with_warning(
    lookup: &dyn Fn(&str) -> Option<String>,
    var_name: &str,
    default: usize,
    validator: impl Fn(usize) -> bool,
    invalid_hint: &str,
) -> usize {
    match lookup(var_name) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(value) if validator(value) => value,
            Ok(_) => {
                warn!(
                    "⚠️ {} contains invalid value '{}': {}. Using {}.",
                    var_name, raw, invalid_hint, default
                );
                default
            }
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}
