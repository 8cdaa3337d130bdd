//! Catalog command - inspect the reference catalog and test matching.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use poex_core::{IdentityMatcher, ReferenceCatalog};

/// Arguments for the catalog command.
#[derive(Args)]
pub struct CatalogArgs {
    /// Reference catalog CSV
    #[arg(short = 'r', long)]
    catalog: PathBuf,

    #[command(subcommand)]
    command: CatalogCommand,
}

#[derive(Subcommand)]
enum CatalogCommand {
    /// Show catalog statistics
    Info,

    /// Resolve extracted identity fields against the catalog
    Match {
        /// Extracted retailer name
        #[arg(long, default_value = "")]
        retailer: String,

        /// Extracted delivery address
        #[arg(long, default_value = "")]
        address: String,

        /// Extracted branch name
        #[arg(long, default_value = "")]
        branch: String,
    },
}

pub async fn run(args: CatalogArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let catalog = ReferenceCatalog::from_path(&args.catalog)?;

    match args.command {
        CatalogCommand::Info => show_info(&catalog),
        CatalogCommand::Match {
            retailer,
            address,
            branch,
        } => show_match(&catalog, &config, &retailer, &address, &branch),
    }
}

fn show_info(catalog: &ReferenceCatalog) -> anyhow::Result<()> {
    let groups: BTreeSet<&str> = catalog
        .entries()
        .iter()
        .filter_map(|e| e.retailer_group.as_deref())
        .collect();
    let with_branch_code = catalog
        .entries()
        .iter()
        .filter(|e| e.branch_code.is_some())
        .count();

    println!("Entries:            {}", catalog.len());
    println!("Retailer groups:    {}", groups.len());
    println!("With branch code:   {}", with_branch_code);
    println!();
    for group in groups {
        let count = catalog
            .entries()
            .iter()
            .filter(|e| e.retailer_group.as_deref() == Some(group))
            .count();
        println!("  {} ({})", group, count);
    }

    Ok(())
}

fn show_match(
    catalog: &ReferenceCatalog,
    config: &poex_core::PoexConfig,
    retailer: &str,
    address: &str,
    branch: &str,
) -> anyhow::Result<()> {
    let matcher = IdentityMatcher::new(catalog, &config.matching);
    let outcome = matcher.resolve(retailer, address, branch);

    match &outcome.resolved {
        Some(resolved) => {
            println!(
                "{} Matched with score {}",
                style("✓").green(),
                outcome.score
            );
            println!("Retailer:    {}", resolved.retailer_name);
            if let Some(branch) = &resolved.branch_label {
                println!("Branch:      {}", branch);
            }
            if let Some(code) = &resolved.branch_code {
                println!("Branch code: {}", code);
            }
            if let Some(debtor) = &resolved.debtor_code {
                println!("Debtor code: {}", debtor);
            }
            println!();
            println!("Signals:");
            for (signal, weight) in outcome.breakdown.contributions() {
                println!("  {:?} (+{})", signal, weight);
            }
        }
        None => {
            println!(
                "{} No match above the acceptance threshold",
                style("✗").red()
            );
        }
    }

    Ok(())
}
