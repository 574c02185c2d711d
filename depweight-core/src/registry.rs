pub mod npm;
pub mod types;

pub use npm::{NpmClient, NpmSpec, SpecSource};
pub use types::{RegistryPackage, RegistryVersion};

use crate::{DepweightError, Result};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

/// A specifier after the registry client has interpreted it.
///
/// `Display` yields the canonical identity used as the memoization key. It
/// must parse back to an equivalent spec through [`RegistryClient::resolve`].
pub trait ResolvedSpec: Clone + fmt::Display + Send + Sync {
    /// Bare package identity, ignoring any version qualifier.
    fn name(&self) -> &str;
}

/// Client state that outlives a single weight computation.
pub trait SessionCache {
    /// Forget everything learned in a previous session.
    fn reset(&self);
}

pub trait RegistryClient {
    type Spec: ResolvedSpec;

    fn resolve(&self, specifier: &str) -> impl Future<Output = Result<Self::Spec>> + Send;

    /// Immediate declared dependencies of the concrete version `spec` selects.
    fn dependencies(
        &self,
        spec: &Self::Spec,
    ) -> impl Future<Output = Result<Vec<Self::Spec>>> + Send;

    /// Clients keeping caches across calls expose them here so they can be
    /// cleared before a computation starts.
    fn session(&self) -> Option<&dyn SessionCache> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    Python,
    Ruby,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Ruby => "ruby",
        }
    }
}

impl FromStr for Language {
    type Err = DepweightError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "python" | "py" => Ok(Language::Python),
            "ruby" | "rb" => Ok(Language::Ruby),
            _ => Err(DepweightError::UnsupportedLanguage(value.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Registry {
    Npm,
    Pypi,
    RubyGems,
}

impl Registry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Registry::Npm => "npm",
            Registry::Pypi => "pypi",
            Registry::RubyGems => "rubygems",
        }
    }
}

impl FromStr for Registry {
    type Err = DepweightError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(Registry::Npm),
            "pypi" => Ok(Registry::Pypi),
            "rubygems" => Ok(Registry::RubyGems),
            _ => Err(DepweightError::UnsupportedRegistry(value.to_string())),
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
