use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepweightError {
    #[error("HTTP request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Invalid package specifier {spec:?}: {reason}")]
    InvalidSpecifier { spec: String, reason: String },

    #[error("Invalid package name {name:?}: {reason}")]
    InvalidPackageName { name: String, reason: String },

    #[error("Failed to resolve {name}@{range}: {reason}")]
    ResolutionFailed {
        name: String,
        range: String,
        reason: String,
    },

    #[error("Invalid semver range {value}: {reason}")]
    Semver { value: String, reason: String },

    #[error("Unsupported language {0:?}")]
    UnsupportedLanguage(String),

    #[error("Unsupported registry {0:?}")]
    UnsupportedRegistry(String),

    #[error("No registry client for {registry} packages in {language}")]
    UnsupportedPair { language: String, registry: String },

    #[error("Epsilon must be a positive number, got {value}")]
    InvalidEpsilon { value: f64 },
}
