use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use askerbot_adaptor_web::{serve, WebConfig};
use askerbot_core::utils::{init_logging, Logger};
use askerbot_core::{load_env, CancellationToken, ChatConfig, CompletionProvider};
use askerbot_plugin_knowledge::ChatService;
use askerbot_provider_openai::OpenAiProvider;
use clap::Parser;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "run-askerbot", about = "Serve the Askerbot chat endpoint")]
struct Cli {
    /// Bind host
    #[arg(long, env = "ASKERBOT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Bind port
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, env = "ASKERBOT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Directory with the exported statistical index
    #[arg(long, env = "ASKERBOT_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    /// Skip CORS headers (when a proxy adds them)
    #[arg(long, default_value_t = false)]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env().context("loading .env")?;
    let cli = Cli::parse();
    std::env::set_var("ASKERBOT_LOG_LEVEL", &cli.log_level);
    init_logging();
    let log = Logger::new("runner");

    let mut config = ChatConfig::from_env();
    if let Some(dir) = cli.index_dir {
        config.index_dir = dir;
    }

    let provider: Option<Arc<dyn CompletionProvider>> = match OpenAiProvider::from_env() {
        Ok(provider) => {
            log.info(&format!("completion model: {}", provider.model()));
            Some(Arc::new(provider))
        }
        Err(e) => {
            warn!("{}; only FAQ and fallback replies will be served", e);
            None
        }
    };

    log.info(&format!(
        "environment={} index_dir={}",
        config.environment,
        config.index_dir.display()
    ));
    let service = Arc::new(ChatService::new(config, provider));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    let web = WebConfig {
        host: cli.host,
        port: cli.port,
        enable_cors: !cli.no_cors,
        ..WebConfig::default()
    };
    serve(web, service, shutdown).await?;
    Ok(())
}
