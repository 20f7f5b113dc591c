use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::catalog::ContainerCatalog;
use crate::suggestions::SuggestionConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "ECOPACK_API_HOST";
    const PORT_VAR: &'static str = "ECOPACK_API_PORT";

    fn from_env() -> Self {
        let (bind_ip, display_host) = parse_host(env_string(Self::HOST_VAR));
        let port = parse_port(env_string(Self::PORT_VAR));
        Self {
            bind_ip,
            display_host,
            port,
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

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

fn parse_host(raw: Option<String>) -> (IpAddr, String) {
    let default_ip = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    let Some(host_value) = raw else {
        return (default_ip, ApiConfig::DEFAULT_HOST.to_string());
    };

    match host_value.parse::<IpAddr>() {
        Ok(ip) => (ip, host_value),
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                ApiConfig::HOST_VAR,
                host_value,
                err,
                ApiConfig::DEFAULT_HOST
            );
            (default_ip, ApiConfig::DEFAULT_HOST.to_string())
        }
    }
}

fn parse_port(raw: Option<String>) -> u16 {
    let Some(raw) = raw else {
        return ApiConfig::DEFAULT_PORT;
    };

    match raw.parse::<u16>() {
        Ok(value) if value != 0 => value,
        Ok(_) => {
            warn!(
                "⚠️ {} must not be 0. Using {}.",
                ApiConfig::PORT_VAR,
                ApiConfig::DEFAULT_PORT
            );
            ApiConfig::DEFAULT_PORT
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                ApiConfig::PORT_VAR,
                raw,
                err,
                ApiConfig::DEFAULT_PORT
            );
            ApiConfig::DEFAULT_PORT
        }
    }
}

/// Configuration for the packing engine: the box catalog and suggestion thresholds.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    catalog: ContainerCatalog,
    suggestion: SuggestionConfig,
}

impl EngineConfig {
    const CATALOG_PATH_VAR: &'static str = "ECOPACK_CATALOG_PATH";
    const MIN_CARBON_SAVED_VAR: &'static str = "ECOPACK_FOLD_MIN_CARBON_SAVED";
    const MIN_EFFICIENCY_GAIN_VAR: &'static str = "ECOPACK_FOLD_MIN_EFFICIENCY_GAIN";

    fn from_env() -> Self {
        let catalog = match env_string(Self::CATALOG_PATH_VAR) {
            Some(path) => match ContainerCatalog::load(&path) {
                Ok(catalog) => {
                    info!("📦 Using container catalog from {}", path);
                    catalog
                }
                Err(err) => {
                    warn!(
                        "⚠️ {} ('{}') could not be loaded: {}. Using built-in catalog.",
                        Self::CATALOG_PATH_VAR,
                        path,
                        err
                    );
                    ContainerCatalog::builtin()
                }
            },
            None => ContainerCatalog::builtin(),
        };

        let min_carbon_saved = load_f64_with_warning(
            Self::MIN_CARBON_SAVED_VAR,
            SuggestionConfig::DEFAULT_MIN_CARBON_SAVED,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted carbon threshold changes which folding suggestions are shown",
        );

        let min_efficiency_gain = load_f64_with_warning(
            Self::MIN_EFFICIENCY_GAIN_VAR,
            SuggestionConfig::DEFAULT_MIN_EFFICIENCY_GAIN,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted efficiency threshold changes which folding suggestions are shown",
        );

        let suggestion = SuggestionConfig::builder()
            .min_carbon_saved(min_carbon_saved)
            .min_efficiency_gain(min_efficiency_gain)
            .build();

        Self::new(catalog, suggestion)
    }

    pub fn new(catalog: ContainerCatalog, suggestion: SuggestionConfig) -> Self {
        Self {
            catalog,
            suggestion,
        }
    }

    pub fn catalog(&self) -> &ContainerCatalog {
        &self.catalog
    }

    pub fn suggestion_config(&self) -> SuggestionConfig {
        self.suggestion
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(ContainerCatalog::builtin(), SuggestionConfig::default())
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
            warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    interpret_f64(
        var_name,
        env_string(var_name),
        default,
        validator,
        invalid_hint,
        warning,
    )
}

fn interpret_f64(
    var_name: &str,
    raw: Option<String>,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    let Some(raw) = raw else {
        return default;
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => {
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                info!("⚠️ {} ({} = {}).", warning, var_name, value);
            }
            value
        }
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
    }
}
