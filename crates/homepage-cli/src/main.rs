//! `homepage` binary

use anyhow::Context;
use clap::ArgMatches;
use homepage_cli::config::{DEFAULT_CONFIG_FILE, STORE_ENV};
use homepage_cli::{build_cli, commands, logging, AppConfig};
use homepage_storage::{JsonFileStorage, Storage};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        tracing::error!("{error:#}");
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();

    let (config_path, required) = match matches.get_one::<PathBuf>("config") {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let config = AppConfig::load(&config_path, required)?.with_store_override(std::env::var(STORE_ENV).ok());

    logging::init(&config.log)?;
    tracing::debug!(
        store = %config.storage.path.display(),
        namespace = %config.storage.namespace,
        "opening data store"
    );

    let storage: Arc<dyn Storage> = Arc::new(
        JsonFileStorage::new(&config.storage.path, &config.storage.namespace)
            .with_authorities(config.principal.authorities.iter().cloned()),
    );

    let output = match matches.subcommand() {
        Some(("status", _)) => commands::status(storage).await?,
        Some(("migrate", _)) => commands::migrate(storage).await?,
        Some(("backup", sub)) => match sub.subcommand_name() {
            Some("create") => commands::backup_create(storage).await?,
            Some("rollback") => commands::backup_rollback(storage).await?,
            Some("delete") => commands::backup_delete(storage).await?,
            _ => unreachable!("backup requires a subcommand"),
        },
        Some(("landing", sub)) => landing(storage, sub).await?,
        _ => unreachable!("a subcommand is required"),
    };

    if !output.is_empty() {
        println!("{output}");
    }

    Ok(())
}

async fn landing(storage: Arc<dyn Storage>, matches: &ArgMatches) -> anyhow::Result<String> {
    match matches.subcommand() {
        Some(("list", _)) => commands::landing_list(storage).await,
        Some(("show", args)) => {
            let id = args.get_one::<String>("id").context("missing node id")?;
            commands::landing_show(storage, id).await
        }
        Some(("delete", args)) => commands::landing_delete(storage, &ids(args)).await,
        Some(("import", args)) => {
            let file = args.get_one::<PathBuf>("file").context("missing import file")?;
            commands::landing_import(storage, file).await
        }
        Some(("export", args)) => {
            let out = args.get_one::<PathBuf>("out").map(PathBuf::as_path);
            commands::landing_export(storage, &ids(args), out, args.get_flag("compact")).await
        }
        _ => unreachable!("landing requires a subcommand"),
    }
}

fn ids(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("ids")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}
