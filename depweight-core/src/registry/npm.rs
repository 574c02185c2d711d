use super::types::RegistryPackage;
use super::{RegistryClient, ResolvedSpec, SessionCache};
use crate::config::{AuthScheme, DepweightConfig};
use crate::validate::validate_package_name;
use crate::version::select_version;
use crate::{DepweightError, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{OnceCell, Semaphore};

const ABBREVIATED_ACCEPT: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecSource {
    Registry,
    /// git, tarball URL, local path or workspace link: no registry manifest.
    Remote,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NpmSpec {
    pub name: String,
    pub range: String,
    pub source: SpecSource,
}

impl NpmSpec {
    /// Parse `name`, `name@range`, `@scope/name@range` or an alias such as
    /// `name@npm:other@range`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(DepweightError::InvalidSpecifier {
                spec: raw.to_string(),
                reason: "specifier is empty".to_string(),
            });
        }

        // Package names only carry `@` as a scope prefix, so the first one
        // after that separates the range even when the range is a URL.
        let separator = trimmed
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '@')
            .map(|(idx, _)| idx);

        match separator {
            Some(idx) => Self::from_parts(&trimmed[..idx], &trimmed[idx + 1..]),
            None => Self::from_parts(trimmed, "latest"),
        }
    }

    /// Build a spec from a manifest entry such as `"react": "^16.8.0"`.
    pub fn from_parts(name: &str, range: &str) -> Result<Self> {
        let range = range.split_whitespace().collect::<Vec<_>>().join(" ");

        if let Some(target) = range.strip_prefix("npm:") {
            let aliased = Self::parse(target)?;
            if aliased.source == SpecSource::Remote {
                return Err(DepweightError::InvalidSpecifier {
                    spec: format!("{name}@{range}"),
                    reason: "npm aliases must point at a registry package".to_string(),
                });
            }
            return Ok(aliased);
        }

        check_name(name)?;

        let range = if range.is_empty() {
            "latest".to_string()
        } else {
            range
        };

        let source = if is_remote_range(&range) {
            SpecSource::Remote
        } else {
            SpecSource::Registry
        };

        Ok(NpmSpec {
            name: name.to_string(),
            range,
            source,
        })
    }
}

impl fmt::Display for NpmSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.range)
    }
}

impl ResolvedSpec for NpmSpec {
    fn name(&self) -> &str {
        &self.name
    }
}

fn check_name(name: &str) -> Result<()> {
    let validation = validate_package_name(name);

    if !validation.valid_for_old_packages {
        return Err(DepweightError::InvalidPackageName {
            name: name.to_string(),
            reason: validation.errors.join("; "),
        });
    }

    if !validation.warnings.is_empty() {
        tracing::debug!(
            "package name {name:?} is legacy-only: {}",
            validation.warnings.join("; ")
        );
    }

    Ok(())
}

fn is_remote_range(range: &str) -> bool {
    const PREFIXES: [&str; 11] = [
        "git:", "git+", "ssh:", "http:", "https:", "file:", "link:", "workspace:", "github:",
        "gitlab:", "bitbucket:",
    ];

    // A bare `user/repo` is GitHub shorthand.
    PREFIXES.iter().any(|prefix| range.starts_with(prefix)) || range.contains('/')
}

pub fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replace('/', "%2F")
    } else {
        name.to_string()
    }
}

type PackumentCell = Arc<OnceCell<Arc<RegistryPackage>>>;

/// Registry client for npm-compatible registries.
///
/// Package documents are fetched once per name and shared by every
/// concurrent caller until [`SessionCache::reset`] is called.
pub struct NpmClient {
    config: DepweightConfig,
    http: Client,
    permits: Semaphore,
    packuments: Mutex<HashMap<String, PackumentCell>>,
}

impl NpmClient {
    pub fn new(config: &DepweightConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("depweight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| DepweightError::Http {
                url: config.default_registry.clone(),
                source,
            })?;

        Ok(NpmClient {
            config: config.clone(),
            http,
            permits: Semaphore::new(config.registry_concurrency.max(1)),
            packuments: Mutex::new(HashMap::new()),
        })
    }

    pub fn cached_packages(&self) -> usize {
        self.packuments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    async fn packument(&self, name: &str) -> Result<Arc<RegistryPackage>> {
        let cell = {
            let mut packuments = self.packuments.lock().unwrap_or_else(PoisonError::into_inner);
            packuments.entry(name.to_string()).or_default().clone()
        };

        let package = cell
            .get_or_try_init(|| async { self.fetch_package(name).await.map(Arc::new) })
            .await?;

        Ok(package.clone())
    }

    async fn fetch_package(&self, name: &str) -> Result<RegistryPackage> {
        let base = self.config.registry_for_package(name);
        let url = format!("{}/{}", base.trim_end_matches('/'), encode_package_name(name));

        let mut request = self
            .http
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static(ABBREVIATED_ACCEPT));

        if let Some(token) = self.config.auth_token_for_url(&url) {
            let header_value = match self.config.auth_scheme_for_url(&url) {
                AuthScheme::Basic => format!("Basic {}", token),
                AuthScheme::Bearer => format!("Bearer {}", token),
            };
            request = request.header(AUTHORIZATION, header_value);
        }

        let _permit = self.permits.acquire().await;

        tracing::debug!("registry request: name={} url={}", name, url);
        let started = Instant::now();

        let response = request.send().await.map_err(|source| DepweightError::Http {
            url: url.clone(),
            source,
        })?;

        tracing::debug!(
            "registry response: name={} status={} in {:.3}s",
            name,
            response.status().as_u16(),
            started.elapsed().as_secs_f64()
        );

        let package = response
            .error_for_status()
            .map_err(|source| DepweightError::Http {
                url: url.clone(),
                source,
            })?
            .json::<RegistryPackage>()
            .await
            .map_err(|source| DepweightError::Http {
                url: url.clone(),
                source,
            })?;

        Ok(package)
    }
}

impl RegistryClient for NpmClient {
    type Spec = NpmSpec;

    async fn resolve(&self, specifier: &str) -> Result<NpmSpec> {
        NpmSpec::parse(specifier)
    }

    async fn dependencies(&self, spec: &NpmSpec) -> Result<Vec<NpmSpec>> {
        if spec.source == SpecSource::Remote {
            tracing::debug!("{spec} is not served by the registry, treating it as a leaf");
            return Ok(Vec::new());
        }

        let package = self.packument(&spec.name).await?;
        let version = select_version(&spec.name, &spec.range, &package)?;

        let mut dependencies = Vec::with_capacity(version.dependencies.len());

        for (dep_name, dep_range) in &version.dependencies {
            match NpmSpec::from_parts(dep_name, dep_range) {
                Ok(dep) => dependencies.push(dep),
                Err(err) => tracing::warn!(
                    "skipping dependency {dep_name}@{dep_range} of {}@{}: {err}",
                    spec.name,
                    version.version
                ),
            }
        }

        Ok(dependencies)
    }

    fn session(&self) -> Option<&dyn SessionCache> {
        Some(self)
    }
}

impl SessionCache for NpmClient {
    fn reset(&self) {
        self.packuments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
