use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};
use wiper::{config, BatchWiper, PolicyTable};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let matches = Command::new("wiper")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Permanently destroys file contents by overwriting them before deletion")
        .arg(
            Arg::new("path")
                .long("path")
                .short('p')
                .help("Path of file or folder to permanently delete")
                .required_unless_present_any(["init-config", "list"])
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("rule")
                .long("rule")
                .short('r')
                .help("Id of the rule used for wiping (see --list)")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("keep")
                .long("keep")
                .help("Do not delete files after wiping")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .help("Report progress of every operation")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jobs")
                .long("jobs")
                .short('j')
                .help("Number of files wiped at the same time")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("no-sync")
                .long("no-sync")
                .help("Do not flush each pass to the device")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("List available rules and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("init-config")
                .long("init-config")
                .help("Create default config file and exit")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("init-config") {
        let config_path = config::get_config_path()?;
        config::create_default_config(&config_path)?;
        println!("Default configuration created at: {}", config_path.display());
        return Ok(());
    }

    let config_file = config::load_config().unwrap_or_else(|e| {
        warn!("Could not load config file, using defaults: {:#}", e);
        config::ConfigFile::default()
    });
    let policies = PolicyTable::with_custom(&config_file.rules)?;

    if matches.get_flag("list") {
        for policy in policies.iter() {
            println!("#{} {}", policy.id, policy);
        }
        return Ok(());
    }

    let rule_id = matches
        .get_one::<u8>("rule")
        .copied()
        .unwrap_or(config_file.defaults.rule);
    let policy = policies
        .get(rule_id)
        .with_context(|| format!("Unknown wipe rule {}", rule_id))?;

    let mut options = config_file.defaults.batch_options();
    options.keep |= matches.get_flag("keep");
    options.report |= matches.get_flag("report");
    options.sync &= !matches.get_flag("no-sync");
    if let Some(jobs) = matches.get_one::<usize>("jobs") {
        options.jobs = *jobs;
    }

    let path = matches
        .get_one::<PathBuf>("path")
        .context("No path given")?;

    println!("Selected rule:\n{}", policy);

    let wiper = BatchWiper::new(policy.rule.clone(), options);
    let summary = wiper.wipe_path(path).await?;

    println!(
        "Wiped {} file(s), {} bytes written, {} removed",
        summary.files, summary.bytes, summary.removed
    );
    Ok(())
}
