use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::time::Duration;

pub mod rc;
pub use self::rc::*;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";
pub const DEFAULT_EPSILON: f64 = 0.01;
pub const DEFAULT_REGISTRY_CONCURRENCY: usize = 16;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Basic,
}

#[derive(Debug, Clone)]
pub struct DepweightConfig {
    pub default_registry: String,
    pub scoped_registries: BTreeMap<String, String>,
    pub registry_auth: BTreeMap<String, String>,
    pub default_registry_auth_token: Option<String>,
    pub default_registry_auth_scheme: AuthScheme,
    pub registry_concurrency: usize,
    pub request_timeout: Duration,
    pub epsilon: f64,
    pub no_comp: BTreeSet<String>,
    pub verbose: bool,
}

impl Default for DepweightConfig {
    fn default() -> Self {
        DepweightConfig {
            default_registry: DEFAULT_REGISTRY.to_string(),
            scoped_registries: BTreeMap::new(),
            registry_auth: BTreeMap::new(),
            default_registry_auth_token: None,
            default_registry_auth_scheme: AuthScheme::Bearer,
            registry_concurrency: DEFAULT_REGISTRY_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            epsilon: DEFAULT_EPSILON,
            no_comp: BTreeSet::new(),
            verbose: false,
        }
    }
}

impl DepweightConfig {
    pub fn from_env() -> Self {
        let rc = read_rc_settings();

        let mut config = DepweightConfig {
            default_registry: rc.default_registry,
            scoped_registries: rc.scoped_registries,
            registry_auth: rc.registry_auth,
            default_registry_auth_token: rc.default_auth_token,
            default_registry_auth_scheme: if rc.default_auth_basic {
                AuthScheme::Basic
            } else {
                AuthScheme::Bearer
            },
            ..DepweightConfig::default()
        };

        if let Ok(value) =
            env::var("NPM_CONFIG_REGISTRY").or_else(|_| env::var("npm_config_registry"))
        {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                // A token read for one host must not leak to another.
                if host_from_url(&config.default_registry) != host_from_url(trimmed) {
                    config.default_registry_auth_token = None;
                }

                config.default_registry = normalize_registry_url(trimmed);
            }
        }

        if let Ok(token) = env::var("NODE_AUTH_TOKEN")
            .or_else(|_| env::var("NPM_TOKEN"))
            .or_else(|_| env::var("DEPWEIGHT_AUTH_TOKEN"))
        {
            let trimmed = token.trim();
            if !trimmed.is_empty() {
                config.default_registry_auth_token = Some(trimmed.to_string());
                config.default_registry_auth_scheme = AuthScheme::Bearer;
            }
        }

        if let Ok(value) = env::var("DEPWEIGHT_REGISTRY_CONCURRENCY")
            && let Ok(parsed) = value.trim().parse::<usize>()
            && parsed > 0
        {
            config.registry_concurrency = parsed;
        }

        if let Ok(value) = env::var("DEPWEIGHT_TIMEOUT_SECS")
            && let Ok(parsed) = value.trim().parse::<u64>()
            && parsed > 0
        {
            config.request_timeout = Duration::from_secs(parsed);
        }

        if let Ok(value) = env::var("DEPWEIGHT_EPSILON")
            && let Ok(parsed) = value.trim().parse::<f64>()
            && parsed.is_finite()
            && parsed > 0.0
        {
            config.epsilon = parsed;
        }

        config.no_comp = read_list_from_env("DEPWEIGHT_NO_COMP");

        config.verbose = match env::var("DEPWEIGHT_VERBOSE") {
            Ok(value) => is_truthy(&value),
            Err(_) => false,
        };

        config
    }

    /// Base URL serving metadata for `name`, honouring `@scope:registry` entries.
    pub fn registry_for_package(&self, name: &str) -> &str {
        if let Some((scope, _)) = name.split_once('/')
            && scope.starts_with('@')
            && let Some(reg) = self.scoped_registries.get(scope)
        {
            return reg;
        }

        &self.default_registry
    }

    pub fn auth_token_for_url(&self, url: &str) -> Option<&str> {
        let host = host_from_url(url)?;

        if let Some(token) = self.registry_auth.get(&host) {
            return Some(token.as_str());
        }

        if let Some(default_host) = host_from_url(&self.default_registry)
            && host == default_host
            && let Some(token) = self.default_registry_auth_token.as_ref()
        {
            return Some(token.as_str());
        }

        None
    }

    pub fn auth_scheme_for_url(&self, url: &str) -> AuthScheme {
        match (host_from_url(url), host_from_url(&self.default_registry)) {
            (Some(host), Some(default_host))
                if host == default_host && !self.registry_auth.contains_key(&host) =>
            {
                self.default_registry_auth_scheme
            }
            _ => AuthScheme::Bearer,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "yes" | "y" | "on")
}
