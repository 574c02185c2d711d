use anyhow::Result;
use clap::Args;
use depweight_core::config::AuthScheme;
use depweight_core::{DepweightConfig, console};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Args, Debug)]
pub struct ConfigArgs {}

pub fn run(_args: ConfigArgs, config: &DepweightConfig) -> Result<()> {
    console::header("config", env!("CARGO_PKG_VERSION"));

    console::info("registry");
    console::info(&format!("  default: {}", config.default_registry));
    console::info(&format!(
        "  default auth: {}",
        format_auth_status(
            config.default_registry_auth_token.as_deref(),
            config.default_registry_auth_scheme
        )
    ));
    print_string_map("scoped registries", &config.scoped_registries);
    print_token_map("registry auth", &config.registry_auth);
    console::info(&format!(
        "  concurrency: {}",
        config.registry_concurrency
    ));
    console::info(&format!(
        "  request timeout: {}s",
        config.request_timeout.as_secs()
    ));
    println!();

    console::info("weights");
    console::info(&format!("  epsilon: {}", config.epsilon));
    console::info(&format!("  no-comp: {}", format_list(&config.no_comp)));
    println!();

    console::info("logging");
    console::info(&format!("  verbose: {}", config.verbose));

    Ok(())
}

fn format_list(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        return "none".to_string();
    }

    values.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn print_string_map(label: &str, values: &BTreeMap<String, String>) {
    if values.is_empty() {
        console::info(&format!("  {}: none", label));
        return;
    }

    console::info(&format!("  {}:", label));
    for (key, value) in values {
        console::info(&format!("    {}: {}", key, value));
    }
}

fn print_token_map(label: &str, values: &BTreeMap<String, String>) {
    if values.is_empty() {
        console::info(&format!("  {}: none", label));
        return;
    }

    console::info(&format!("  {}:", label));
    for key in values.keys() {
        console::info(&format!("    {}: set", key));
    }
}

fn format_auth_status(token: Option<&str>, scheme: AuthScheme) -> String {
    if token.is_none() {
        return "none".to_string();
    }

    let label = match scheme {
        AuthScheme::Bearer => "bearer",
        AuthScheme::Basic => "basic",
    };

    format!("set ({})", label)
}
