use std::sync::Arc;

use callflow_core::completion::{CompletionBackend, OpenAiCompletionClient};
use callflow_core::CallflowConfig;
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use callflow_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "callflow.toml")]
    config: String,

    /// Report configuration status and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match CallflowConfig::load_or_default(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // The credential is read once; without it every agent request is a 500.
    let backend: Option<Arc<dyn CompletionBackend>> =
        match OpenAiCompletionClient::from_env(config.completion.clone())? {
            Some(client) => Some(Arc::new(client)),
            None => {
                tracing::warn!("OPENAI_API_KEY is not set; /api/agent will answer 500 until it is");
                None
            }
        };

    if args.check {
        println!("Config:     {}", args.config);
        println!("Listen:     {}:{}", config.http.host, config.http.port);
        println!("Model:      {}", config.completion.model);
        println!("Timezone:   {}", config.display.tz());
        match &backend {
            Some(_) => println!("✅ OPENAI_API_KEY configured"),
            None => {
                println!("❌ OPENAI_API_KEY missing");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = Arc::new(HttpState::new(config, backend));
    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
