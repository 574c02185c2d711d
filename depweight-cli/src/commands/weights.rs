use anyhow::Result;
use clap::Args;
use depweight_core::operations::{self, WeighOptions};
use depweight_core::weights::total_weight;
use depweight_core::{DepweightConfig, Language, Registry, WeightMap, console};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct WeightsArgs {
    /// Package specifiers, e.g. `react@^18` or `@babel/core`
    pub specifiers: Vec<String>,

    /// Ecosystem the packages belong to
    #[arg(short, long, default_value = "javascript")]
    pub language: String,

    /// Registry hosting the packages
    #[arg(short, long, default_value = "npm")]
    pub registry: String,

    /// Smallest share worth subdividing further
    #[arg(short, long)]
    pub epsilon: Option<f64>,

    /// Packages whose share passes through to their dependencies
    #[arg(long = "no-comp", value_delimiter = ',')]
    pub no_comp: Vec<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct WeightsOutput<'a> {
    weights: &'a WeightMap,
    total: f64,
    discarded: f64,
}

pub async fn run(args: WeightsArgs, config: &DepweightConfig) -> Result<()> {
    let language: Language = args.language.parse()?;
    let registry: Registry = args.registry.parse()?;

    if !args.json {
        console::header("weights", env!("CARGO_PKG_VERSION"));
    }

    if args.specifiers.is_empty() && !args.json {
        console::warn("no packages given, nothing to weigh");
    }

    let options = WeighOptions {
        language,
        registry,
        specifiers: args.specifiers,
        epsilon: args.epsilon,
        no_comp: args.no_comp.into_iter().collect(),
    };

    let propagation = operations::weigh(config, options).await?;
    let total = total_weight(&propagation.weights);

    if args.json {
        let output = WeightsOutput {
            weights: &propagation.weights,
            total,
            discarded: propagation.discarded,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let mut rows: Vec<(&String, &f64)> = propagation.weights.iter().collect();
    rows.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (name, weight) in rows {
        console::weight(name, *weight);
    }

    console::summary(propagation.weights.len(), total, propagation.discarded);

    Ok(())
}
