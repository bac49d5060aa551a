use anyhow::Context;
use bookshare_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookshare-cli", version, about = "Operator commands for the bookshare backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every registered route with its access class
    Routes,
    /// Load settings, build the identity verifier and ping the database
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Routes => print_routes(),
        Command::Check => check().await,
    }
}

fn print_routes() -> anyhow::Result<()> {
    let registry = bookshare::registry();
    registry.validate()?;

    for route in registry.route_table() {
        println!(
            "{:<7} {:<22} {:<14} {}",
            route.method,
            route.path,
            route.access.to_string(),
            route.module
        );
    }
    Ok(())
}

async fn check() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    bookshare_telemetry::init(&settings.telemetry)?;

    tracing::info!(env = ?settings.environment, "settings loaded");

    let verifier = bookshare::build_verifier(&settings.auth)?;
    tracing::info!(provider = verifier.provider(), "identity verifier ready");

    let store = bookshare::connect_store(&settings.database).await?;
    store
        .ping()
        .await
        .with_context(|| format!("database '{}' is unreachable", settings.database.name))?;
    tracing::info!(backend = store.backend(), "database reachable");

    println!("ok");
    Ok(())
}
