use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use shopbot::config::default_config_path;
use shopbot::{BotConfig, ChatEngine, SessionStore, SubmitOutcome};

#[derive(Parser)]
#[command(name = "shopbot")]
#[command(about = "Customer-service chat bot for the tech shop", long_about = None)]
struct Cli {
    /// JSON config file (defaults to the per-user config if present)
    #[arg(long, global = true, env = "SHOPBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat in the terminal
    Chat,
    /// Answer one question in a fresh session
    Ask { question: String },
    /// Show which route a standalone question takes
    Route { question: String },
    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat => {
            let config = load_config(cli.config.as_deref())?;
            let engine = build_engine(&config).await?;
            run_chat(&engine, &config).await?;
        }
        Commands::Ask { question } => {
            let config = load_config(cli.config.as_deref())?;
            let engine = build_engine(&config).await?;
            let store = SessionStore::new(config.history.capacity);
            let (id, session) = store.create();
            let outcome = engine.submit(&mut *session.lock().await, &question).await?;
            if let SubmitOutcome::Answered { answer, .. } = outcome {
                println!("{}", answer);
            }
            store.end(&id);
        }
        Commands::Route { question } => {
            let config = load_config(cli.config.as_deref())?;
            let engine = build_engine(&config).await?;
            let router = engine
                .router()
                .ok_or_else(|| anyhow!("routing is only available with the routed pipeline"))?;
            let matched = router.route(&question).await?;
            println!("{}", serde_json::to_string_pretty(&matched)?);
        }
        Commands::Config => {
            let config = effective_config(cli.config.as_deref())?;
            if let Err(problem) = config.validate() {
                eprintln!("warning: {}", problem);
            }
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    BotConfig::load(path)
        .map_err(|e| anyhow!(e))
        .context("Failed to load configuration")
}

/// Same layering as `BotConfig::load`, without rejecting incomplete values.
fn effective_config(path: Option<&Path>) -> Result<BotConfig> {
    let file = path
        .map(Path::to_path_buf)
        .or_else(|| default_config_path().filter(|p| p.exists()));
    let mut config = match file {
        Some(file) => BotConfig::from_file(&file).map_err(|e| anyhow!(e))?,
        None => BotConfig::default(),
    };
    config.apply_env_from(|key| std::env::var(key).ok());
    Ok(config)
}

async fn build_engine(config: &BotConfig) -> Result<ChatEngine> {
    ChatEngine::from_config(config)
        .await
        .context("Failed to connect to the hosted services")
}

async fn run_chat(engine: &ChatEngine, config: &BotConfig) -> Result<()> {
    let store = SessionStore::new(config.history.capacity);
    let (id, session) = store.create();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Ask about our laptops, smartphones, headphones, smartwatches or home theater. \
         Type 'exit' to quit."
    );
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if matches!(input, "exit" | "quit") {
            break;
        }

        let mut guard = session.lock().await;
        match engine.submit(&mut guard, input).await {
            Ok(SubmitOutcome::Answered { question, answer, .. }) => {
                println!("**User:** {}", question);
                println!("**Bot:** {}", answer);
            }
            Ok(SubmitOutcome::Ignored) => {}
            Err(e) => eprintln!("error: {}", e),
        }
    }

    store.end(&id);
    Ok(())
}
