use clap::{Parser, Subcommand};
use neraca_runtime::auth::SharedSecret;
use neraca_runtime::datastore::DataStore;
use neraca_runtime::store::init_datastore;
use neraca_runtime::{report, seed};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod routes;
mod security;

#[derive(Parser)]
#[command(name = "neraca")]
#[command(about = "Neraca financial reporting backend")]
struct Cli {
    /// `memory` or a `sqlite:` URL
    #[arg(long, global = true, env = "NERACA_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "PORT", default_value = "3000")]
        port: u16,
        /// Shared secret for journal writes; plain or `sha256:<hex>`
        #[arg(long, env = "NERACA_JOURNAL_SECRET", hide_env_values = true)]
        journal_secret: Option<String>,
    },
    /// Close the books for a month (`YYYY-MM`)
    Close {
        period: String,
        /// Period code whose balances seed this close, when the previous month was never closed
        #[arg(long)]
        previous: Option<String>,
    },
    /// Print a financial statement
    Report {
        /// balance-sheet, income-statement, cash-flow or equity-changes
        key: String,
        /// Balance key (`YYYY-MM-DD`)
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Load documents from a JSON array file
    Seed { collection: String, file: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let datastore = init_datastore(cli.database_url.as_deref()).await?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            journal_secret,
        } => serve(datastore, &host, port, journal_secret.as_deref()).await,
        Commands::Close { period, previous } => {
            let result = neraca_plugins::finance::close_books(datastore.as_ref(), &period, previous.as_deref()).await;
            let output = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            println!("{}", output);
            if result.success { Ok(()) } else { Err(result.message) }
        }
        Commands::Report { key, period, json } => {
            let report = report::assemble_report(datastore.as_ref(), &key, period.as_deref())
                .await
                .map_err(|e| e.message().to_string())?;
            if json {
                let output = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
                println!("{}", output);
            } else {
                print!("{}", report::render_text(&report));
            }
            Ok(())
        }
        Commands::Seed { collection, file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
            let documents: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| format!("Invalid JSON in {}: {}", file.display(), e))?;
            let outcome = seed::seed_documents(datastore.as_ref(), &collection, documents)
                .await
                .map_err(|e| e.message().to_string())?;
            println!(
                "Seeded {} documents into {} ({} batches).",
                outcome.documents, collection, outcome.batches
            );
            Ok(())
        }
    }
}

async fn serve(datastore: Arc<dyn DataStore>, host: &str, port: u16, journal_secret: Option<&str>) -> Result<(), String> {
    let secret = SharedSecret::new(journal_secret).map_err(|e| e.message().to_string())?;
    if !secret.is_configured() {
        tracing::warn!("NERACA_JOURNAL_SECRET is not set; journal writes will be rejected");
    }

    let app = routes::router(routes::AppState {
        datastore,
        secret: Arc::new(secret),
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await.map_err(|e| e.to_string())
}
