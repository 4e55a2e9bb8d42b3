use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::catalog::DEFAULT_CATALOG_TTL;
use crate::engine::PackingConfig;
use crate::strategy::StrategyKind;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub catalog: CatalogConfig,
    pub resolution: ResolutionConfig,
    pub remote: Option<RemoteApiConfig>,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            store: StoreConfig::from_env(),
            catalog: CatalogConfig::from_env(),
            resolution: ResolutionConfig::from_env(),
            remote: RemoteApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
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
    const HOST_VAR: &'static str = "PACKWISE_API_HOST";
    const PORT_VAR: &'static str = "PACKWISE_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    var = Self::HOST_VAR,
                    value = %host_value,
                    error = %err,
                    "could not parse host, using {}",
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        var = Self::PORT_VAR,
                        "port must not be 0, using {}",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        var = Self::PORT_VAR,
                        value = %raw,
                        error = %err,
                        "could not parse port, using {}",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

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

/// Location of the JSON store file.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    path: PathBuf,
}

impl StoreConfig {
    const DEFAULT_PATH: &'static str = "packwise-store.json";

    fn from_env() -> Self {
        Self {
            path: env_string("PACKWISE_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_PATH)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// How long the packaging catalog may be served from memory.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    ttl: Duration,
}

impl CatalogConfig {
    const TTL_VAR: &'static str = "PACKWISE_CATALOG_TTL_SECS";

    fn from_env() -> Self {
        Self {
            ttl: load_secs(Self::TTL_VAR, DEFAULT_CATALOG_TTL),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Order in which the resolution chain consults its strategies.
#[derive(Clone, Debug)]
pub struct ResolutionConfig {
    order: Vec<StrategyKind>,
}

impl ResolutionConfig {
    const ORDER_VAR: &'static str = "PACKWISE_STRATEGY_ORDER";

    fn from_env() -> Self {
        let order = env_string(Self::ORDER_VAR)
            .map(|raw| parse_strategy_order(&raw))
            .unwrap_or_else(|| StrategyKind::DEFAULT_ORDER.to_vec());
        Self { order }
    }

    pub fn order(&self) -> &[StrategyKind] {
        &self.order
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            order: StrategyKind::DEFAULT_ORDER.to_vec(),
        }
    }
}

/// Access to the remote bin packing API.
#[derive(Clone, Debug)]
pub struct RemoteApiConfig {
    base_url: String,
    username: String,
    api_key: String,
    timeout: Duration,
}

impl RemoteApiConfig {
    const URL_VAR: &'static str = "PACKWISE_BINPACKING_URL";
    const USERNAME_VAR: &'static str = "PACKWISE_BINPACKING_USERNAME";
    const API_KEY_VAR: &'static str = "PACKWISE_BINPACKING_API_KEY";
    const TIMEOUT_VAR: &'static str = "PACKWISE_BINPACKING_TIMEOUT_SECS";
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    fn from_env() -> Option<Self> {
        let Some(base_url) = env_string(Self::URL_VAR) else {
            info!(
                var = Self::URL_VAR,
                "remote bin packing API not configured"
            );
            return None;
        };

        Some(Self {
            base_url,
            username: env_string(Self::USERNAME_VAR).unwrap_or_default(),
            api_key: env_string(Self::API_KEY_VAR).unwrap_or_default(),
            timeout: load_secs(Self::TIMEOUT_VAR, Self::DEFAULT_TIMEOUT),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Configuration for heuristic pack optimization.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    packing: PackingConfig,
}

impl OptimizerConfig {
    const GRID_STEP_VAR: &'static str = "PACKWISE_PACKING_GRID_STEP";
    const SUPPORT_RATIO_VAR: &'static str = "PACKWISE_PACKING_SUPPORT_RATIO";
    const ALLOW_ROTATION_VAR: &'static str = "PACKWISE_PACKING_ALLOW_ROTATIONS";

    fn from_env() -> Self {
        let grid_step = load_f64_with_warning(
            Self::GRID_STEP_VAR,
            PackingConfig::DEFAULT_GRID_STEP,
            |value| value > 0.0,
            "must be greater than 0",
            "adjusted grid step changes which positions the packer tries",
        );

        let support_ratio = load_f64_with_warning(
            Self::SUPPORT_RATIO_VAR,
            PackingConfig::DEFAULT_SUPPORT_RATIO,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "adjusted minimum support may lead to unstable stacks",
        );

        let allow_item_rotation = env_string(Self::ALLOW_ROTATION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ALLOW_ROTATION_VAR))
            .unwrap_or(PackingConfig::DEFAULT_ALLOW_ITEM_ROTATION);

        let packing = PackingConfig::builder()
            .grid_step(grid_step)
            .support_ratio(support_ratio)
            .allow_item_rotation(allow_item_rotation)
            .build();

        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
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
            warn!(var = name, error = %err, "could not read variable, using default value");
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
                var = var_name,
                value = other,
                "could not interpret value as boolean, using default value"
            );
            None
        }
    }
}

/// Parses a comma-separated strategy list.
///
/// Unknown names are skipped, repeated names count once, and an empty
/// result falls back to the default order.
fn parse_strategy_order(raw: &str) -> Vec<StrategyKind> {
    let mut order = Vec::new();
    for name in raw.split(',').filter(|name| !name.trim().is_empty()) {
        match name.parse::<StrategyKind>() {
            Ok(kind) if !order.contains(&kind) => order.push(kind),
            Ok(kind) => warn!(strategy = %kind, "strategy listed twice, ignoring repeat"),
            Err(err) => warn!(error = %err, "skipping strategy"),
        }
    }

    if order.is_empty() {
        warn!("no usable strategy configured, using default order");
        return StrategyKind::DEFAULT_ORDER.to_vec();
    }
    order
}

fn load_secs(var_name: &str, default: Duration) -> Duration {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            Ok(_) => {
                warn!(var = var_name, "must be greater than 0, using {:?}", default);
                default
            }
            Err(err) => {
                warn!(
                    var = var_name,
                    value = %raw,
                    error = %err,
                    "could not parse seconds, using {:?}",
                    default
                );
                default
            }
        },
        None => default,
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    warn!(
                        var = var_name,
                        value = %raw,
                        "invalid value ({}), using {}",
                        invalid_hint,
                        default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        warn!(var = var_name, value, "{}", warning);
                    }
                    value
                }
            }
            Err(err) => {
                warn!(
                    var = var_name,
                    value = %raw,
                    error = %err,
                    "could not parse number, using {}",
                    default
                );
                default
            }
        },
        None => default,
    }
}
