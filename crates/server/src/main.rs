//! Pitchcraft Server
//!
//! Axum server that embeds the strategy form and serves the API routes,
//! plus CLI subcommands for one-off runs without a browser.

mod api;
mod logger;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pitchcraft_core::config::{self, AppConfig, DATA_DIR};
use pitchcraft_core::history::{RunStore, DB_FILE};
use pitchcraft_core::llm::RadkitClient;
use pitchcraft_core::marketing::{generate_strategy, preflight, StrategyRequest};
use tokio::net::TcpListener;

use crate::api::{AppState, SharedState};

#[derive(Parser, Clone)]
#[command(author, version, about = "Pitchcraft - Marketing strategies from a crew of LLM agents")]
struct Args {
    /// Debug logging for Pitchcraft crates (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the Pitchcraft server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Generate a strategy in the terminal (no server)
    Run {
        /// Customer domain, e.g. crewai.com
        #[arg(long)]
        domain: String,
        /// Project description
        #[arg(long)]
        description: String,
        /// Run without web search and scraping tools
        #[arg(long)]
        no_search: bool,
        /// LLM provider (openai, anthropic, gemini, openrouter, grok, deepseek)
        #[arg(long)]
        provider: Option<String>,
        /// Model name, defaults to the provider's default model
        #[arg(long)]
        model: Option<String>,
        /// JSON crew definition to run instead of the built-in crew
        #[arg(long)]
        crew_file: Option<PathBuf>,
        /// Print every task's output, not only the final one
        #[arg(long)]
        all_tasks: bool,
    },
    /// Print the active crew definition as JSON
    Crew,
    /// Create .pitchcraft/ with a default config
    Init,
}

// === Server Entry ===

pub async fn run_server(data_dir: &Path, port: u16) -> anyhow::Result<()> {
    let runs = RunStore::open_at(data_dir.join(DB_FILE)).context("Failed to open run history")?;

    let config = AppConfig::load_from(data_dir).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable config: {}", e);
        AppConfig::default()
    });
    config.apply_to_env();

    let state: SharedState = Arc::new(AppState::new(data_dir.to_path_buf(), runs));
    let app = api::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Pitchcraft server running at http://{}", addr);
    tracing::info!("   Form:      /");
    tracing::info!("   Strategy:  /api/v1/strategy (POST), /status, /events, /crew");
    tracing::info!("   Config:    /api/v1/config (GET, PATCH), /providers");
    tracing::info!("   History:   /api/v1/runs");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// === CLI Commands ===

async fn run_once(
    data_dir: &Path,
    request: StrategyRequest,
    overrides: AppConfig,
    all_tasks: bool,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load_from(data_dir)?;
    config.merge(overrides);
    config.apply_to_env();

    if let Err(e) = preflight(config.provider(), config.search_enabled(), &request) {
        anyhow::bail!(e.user_message());
    }

    let mut spec = config.crew_spec()?;
    if !config.search_enabled() {
        spec = spec.without_tools();
    }

    let model = config.model_config();
    tracing::info!(
        provider = model.provider.id(),
        model = %model.model,
        search = config.search_enabled(),
        "Running crew '{}'",
        spec.name
    );

    let client = RadkitClient::new(model);
    match generate_strategy(&client, spec, &request, None).await {
        Ok(output) if all_tasks => println!("{}", output.to_markdown()),
        Ok(output) => println!("{}", output.final_output()),
        Err(e) => {
            tracing::error!("Crew failed: {:?}", e);
            anyhow::bail!(e.user_message());
        }
    }
    Ok(())
}

fn print_crew(data_dir: &Path) -> anyhow::Result<()> {
    let spec = AppConfig::load_from(data_dir)?.crew_spec()?;
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

fn init(data_dir: &Path) -> anyhow::Result<()> {
    if AppConfig::path_in(data_dir).exists() {
        println!("Already initialized: {}", AppConfig::path_in(data_dir).display());
        return Ok(());
    }

    AppConfig::default().save_to(data_dir)?;
    // Creates .gitignore and an empty .env
    config::write_env_file(data_dir, &config::ApiKeys::default())?;

    println!("Pitchcraft initialized!");
    println!("   Created: {}", AppConfig::path_in(data_dir).display());
    println!("   Created: {}", data_dir.join(config::ENV_FILE).display());
    println!("\nAdd API keys to the .env file or the settings form, then run `pitchcraft serve`");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_logger(args.verbose);

    let data_dir = PathBuf::from(DATA_DIR);
    config::load_env(&data_dir);

    match args.command.unwrap_or(CliCommand::Serve { port: 8080 }) {
        CliCommand::Serve { port } => run_server(&data_dir, port).await,
        CliCommand::Run {
            domain,
            description,
            no_search,
            provider,
            model,
            crew_file,
            all_tasks,
        } => {
            let overrides = AppConfig {
                provider,
                model,
                search_enabled: no_search.then_some(false),
                crew_file,
                ..AppConfig::default()
            };
            run_once(
                &data_dir,
                StrategyRequest::new(domain, description),
                overrides,
                all_tasks,
            )
            .await
        }
        CliCommand::Crew => print_crew(&data_dir),
        CliCommand::Init => init(&data_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let args = Args::try_parse_from([
            "pitchcraft",
            "run",
            "--domain",
            "crewai.com",
            "--description",
            "Launch",
            "--no-search",
            "--provider",
            "anthropic",
        ])
        .unwrap();

        match args.command {
            Some(CliCommand::Run {
                domain,
                no_search,
                provider,
                model,
                ..
            }) => {
                assert_eq!(domain, "crewai.com");
                assert!(no_search);
                assert_eq!(provider.as_deref(), Some("anthropic"));
                assert!(model.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_serve_port_default() {
        let args = Args::try_parse_from(["pitchcraft", "serve"]).unwrap();
        assert!(matches!(args.command, Some(CliCommand::Serve { port: 8080 })));
        assert!(Args::try_parse_from(["pitchcraft"]).unwrap().command.is_none());
    }

    #[test]
    fn test_init_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join(".pitchcraft");

        init(&data_dir).unwrap();

        assert!(AppConfig::path_in(&data_dir).exists());
        assert!(data_dir.join(".gitignore").exists());
        assert!(data_dir.join(config::ENV_FILE).exists());
        // Second call leaves things alone
        init(&data_dir).unwrap();
    }
}
