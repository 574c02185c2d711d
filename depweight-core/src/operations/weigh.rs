use crate::registry::{Language, NpmClient, Registry};
use crate::weights::{Propagation, WeightOptions, propagate};
use crate::{DepweightConfig, DepweightError, Result};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct WeighOptions {
    pub language: Language,
    pub registry: Registry,
    pub specifiers: Vec<String>,
    /// Falls back to the configured epsilon.
    pub epsilon: Option<f64>,
    /// Added to the configured no-comp set.
    pub no_comp: BTreeSet<String>,
}

/// Weigh `specifiers` using the registry client for the requested pair.
pub async fn weigh(config: &DepweightConfig, options: WeighOptions) -> Result<Propagation> {
    let WeighOptions {
        language,
        registry,
        specifiers,
        epsilon,
        no_comp,
    } = options;

    let weight_options = WeightOptions::new(epsilon.unwrap_or(config.epsilon))
        .with_no_comp(config.no_comp.iter().cloned().chain(no_comp));

    match (language, registry) {
        (Language::JavaScript, Registry::Npm) => {
            weight_options.validate()?;
            let client = NpmClient::new(config)?;
            propagate(&specifiers, &client, &weight_options).await
        }
        (language, registry) => Err(DepweightError::UnsupportedPair {
            language: language.to_string(),
            registry: registry.to_string(),
        }),
    }
}
