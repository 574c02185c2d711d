use anyhow::{Result, bail};
use clap::Args;
use depweight_core::console;
use depweight_core::validate::{ValidationResult, validate_package_name};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Package names to check
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ValidationEntry<'a> {
    name: &'a str,
    #[serde(flatten)]
    result: &'a ValidationResult,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let results: Vec<ValidationResult> = args
        .names
        .iter()
        .map(|name| validate_package_name(name))
        .collect();

    let invalid = results
        .iter()
        .filter(|result| !result.valid_for_old_packages)
        .count();

    if args.json {
        let entries: Vec<ValidationEntry> = args
            .names
            .iter()
            .zip(&results)
            .map(|(name, result)| ValidationEntry { name, result })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for (name, result) in args.names.iter().zip(&results) {
            if result.valid_for_old_packages {
                console::valid(name);
            } else {
                console::invalid(name);
            }

            for error in &result.errors {
                console::info(&format!("  error: {}", error));
            }

            for warning in &result.warnings {
                console::info(&format!("  warning: {}", warning));
            }
        }
    }

    if invalid > 0 {
        let noun = if invalid == 1 { "name" } else { "names" };
        bail!("{} invalid package {}", invalid, noun);
    }

    Ok(())
}
