use serde::Deserialize;
use std::collections::BTreeMap;

/// The subset of an npm package document (packument) needed to pick a
/// version and read its dependencies. Works with both the full and the
/// abbreviated (`application/vnd.npm.install-v1+json`) representations.
#[derive(Clone, Debug, Deserialize)]
pub struct RegistryPackage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub versions: BTreeMap<String, RegistryVersion>,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RegistryVersion {
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}
