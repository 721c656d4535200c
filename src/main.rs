//! capaudit - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use capaudit::catalog;
use capaudit::cli::{Args, Commands, Config, Verbosity};
use capaudit::errors::AuditError;
use capaudit::harness::AuditHarness;
use capaudit::namespace::Namespace;
use capaudit::output::SilentSink;
use capaudit::probe::ProbeContext;
use capaudit::sim;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.clone())?;

    if !config.output.color_output {
        colored::control::set_override(false);
    }

    match &args.command {
        None | Some(Commands::Run) => {
            run_audit(&args, &config).await?;
        }
        Some(Commands::List) => {
            list_catalog(&args)?;
        }
        Some(Commands::Snapshot { output }) => {
            write_snapshot(&args, &config, output.as_deref())?;
        }
        Some(Commands::Config) => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

/// CLI flags win; the config file only fills in what was not given
fn effective_verbosity(args: &Args, config: &Config) -> Verbosity {
    if args.quiet || args.verbose > 0 {
        return args.verbosity();
    }
    match config.output.default_verbosity.as_str() {
        "quiet" => Verbosity::Quiet,
        "verbose" => Verbosity::Verbose,
        "very_verbose" => Verbosity::VeryVerbose,
        _ => Verbosity::Normal,
    }
}

fn effective_categories(args: &Args, config: &Config) -> Vec<String> {
    if !args.categories.is_empty() {
        args.categories.clone()
    } else {
        config.audit.categories.clone()
    }
}

async fn run_audit(args: &Args, config: &Config) -> Result<()> {
    let verbosity = effective_verbosity(args, config);
    let categories = effective_categories(args, config);
    let snapshot = args.snapshot.clone().or_else(|| config.snapshot_path());

    let (env, target) = match &snapshot {
        Some(path) => {
            let ns = Namespace::from_snapshot_file(path)?;
            (Arc::new(ns), format!("snapshot {}", path.display()))
        }
        None => {
            let seed = args.seed.unwrap_or(config.sim.seed);
            (
                sim::build_namespace(seed),
                format!("simulated executor (seed {seed})"),
            )
        }
    };

    // a snapshot binds no callable functions, so only presence can be
    // audited against one
    let probes = if snapshot.is_some() {
        if categories.is_empty() {
            catalog::presence(Arc::clone(&env))
        } else {
            catalog::presence_by_categories(Arc::clone(&env), &categories)?
        }
    } else {
        let ctx = ProbeContext::new(Arc::clone(&env));
        if categories.is_empty() {
            catalog::all(&ctx)
        } else {
            catalog::by_categories(&ctx, &categories)?
        }
    };

    let mut harness = AuditHarness::new(env)
        .with_target(&target)
        .with_timing(verbosity.show_timing());
    if !verbosity.show_live() {
        harness = harness.with_sink(Arc::new(SilentSink));
    }
    harness.register_all(probes);

    if verbosity.show_diagnostics() {
        eprintln!(
            "[AUDIT] {} probes registered against {}",
            harness.probe_count(),
            target
        );
    }

    let report = harness.run().await;
    println!();
    report.print();

    if !report.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}

fn list_catalog(args: &Args) -> Result<()> {
    let requested: Vec<String> = args.categories.iter().map(|c| c.to_lowercase()).collect();
    let known = catalog::category_names();
    for name in &requested {
        if !known.contains(&name.as_str()) {
            return Err(AuditError::UnknownCategory(name.clone()).into());
        }
    }

    let mut current = "";
    let mut total = 0usize;
    let mut tested = 0usize;

    for entry in catalog::listing() {
        if !requested.is_empty() && !requested.iter().any(|c| c == entry.category) {
            continue;
        }

        if entry.category != current {
            current = entry.category;
            println!("\n{}", current.bold());
        }

        let marker = if entry.tested {
            "✓".green()
        } else {
            "○".dimmed()
        };
        if entry.aliases.is_empty() {
            println!("  {} {}", marker, entry.name);
        } else {
            println!("  {} {} (aliases: {})", marker, entry.name, entry.aliases.join(", "));
        }

        total += 1;
        if entry.tested {
            tested += 1;
        }
    }

    println!("\n{} capabilities, {} with behavior tests", total, tested);
    Ok(())
}

fn write_snapshot(args: &Args, config: &Config, output: Option<&Path>) -> Result<()> {
    let seed = args.seed.unwrap_or(config.sim.seed);
    let env = sim::build_namespace(seed);
    let rendered = serde_json::to_string_pretty(&env.to_snapshot())?;

    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!(
                "{} Snapshot of {} top-level names written to {}",
                "✓".green(),
                env.top_level_names().len(),
                path.display()
            );
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let rule = "═".repeat(46);
    println!("{}", rule);
    println!("  capaudit Configuration");
    println!("{}", rule);
    println!();

    println!("Audit:");
    if config.audit.categories.is_empty() {
        println!("  Categories: all");
    } else {
        println!("  Categories: {}", config.audit.categories.join(", "));
    }
    match &config.audit.snapshot {
        Some(path) => println!("  Snapshot:   {}", path),
        None => println!("  Snapshot:   none (simulated executor)"),
    }
    println!();

    println!("Simulator:");
    println!("  Seed: {}", config.sim.seed);
    println!();

    println!("Output:");
    println!("  Verbosity: {}", effective_verbosity(args, config).as_str());
    println!(
        "  Color:     {}",
        if config.output.color_output {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();

    Ok(())
}
