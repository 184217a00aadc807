//! Triage Assistant - Main Entry Point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn, Level};
use triage_assistant::config::{ConfigError, TriageConfig};
use triage_assistant::conversation::Conversation;
use triage_assistant::llm::provider::LlmProvider;
use triage_assistant::llm::providers::{
    OpenAiConfig, OpenAiProvider, MOONSHOT_BASE_URL, OPENAI_BASE_URL,
};
use triage_assistant::observability::{init_default_logging, init_logging_at, metrics::metrics};
use triage_assistant::error::{TriageError, TriageResult};
use triage_assistant::server::{self, AppState};
use triage_assistant::speech::{build_recognizer, SpeechRecognizer};
use triage_assistant::triage::{prompts, TriageEngine, TriageSettings};

/// Web medical triage assistant
#[derive(Parser)]
#[command(name = "triage-assistant")]
#[command(about = "Symptom-collecting triage chatbot with medical record generation")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace); overrides LOG_LEVEL
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the configured listen port
        #[arg(long, env = "TRIAGE_PORT")]
        port: Option<u16>,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.verbose {
        0 => init_default_logging(),
        1 => init_logging_at(Level::DEBUG),
        _ => init_logging_at(Level::TRACE),
    }

    info!("Starting triage assistant v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(kind = e.kind(), "Failed to load configuration: {}", e.public_message());
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve { port } => run_server(config, port).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!(kind = e.kind(), "Command failed: {}", e.public_message());
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: &Option<PathBuf>) -> TriageResult<TriageConfig> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(TriageConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["triage.toml", "config/triage.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(TriageConfig::load_from_file(&path)?);
                }
            }

            Err(ConfigError::NotFound(default_paths.join(", ")).into())
        }
    }
}

async fn run_server(config: TriageConfig, port_override: Option<u16>) -> TriageResult<()> {
    let llm = LlmProviderFactory::create_provider(&config)?;
    if let Err(e) = llm.health_check().await {
        warn!(provider = llm.name(), error = %e, "LLM provider health check failed; continuing");
    }

    let speech = SpeechRecognizerFactory::create_recognizer(&config)?;
    match &speech {
        Some(recognizer) => info!(recognizer = recognizer.name(), "Speech input enabled"),
        None => info!("Speech input disabled"),
    }

    let system_prompt = config
        .triage
        .system_prompt
        .clone()
        .unwrap_or_else(|| prompts::SYSTEM_MESSAGE.to_string());
    let conversation = Conversation::shared(system_prompt);
    let engine = TriageEngine::new(llm, TriageSettings::from(&config));
    let state = Arc::new(AppState::new(
        engine,
        conversation,
        speech,
        config.server.max_upload_bytes,
    ));

    let port = port_override.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .map_err(|e| {
            ConfigError::InvalidConfig(format!("bad listen address {}: {e}", config.server.host))
        })?;
    info!(
        model = %config.llm.model,
        min_messages = config.triage.min_messages,
        "Serving triage assistant on http://{}",
        addr
    );

    server::serve(state, addr, shutdown_signal()).await?;

    let snapshot = metrics().get_metrics();
    info!(
        consultations_completed = snapshot.consultations.completed,
        uptime_seconds = snapshot.uptime_seconds,
        "Server stopped"
    );
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

/// Provider factory for creating LLM providers from configuration
struct LlmProviderFactory;

impl LlmProviderFactory {
    fn create_provider(config: &TriageConfig) -> TriageResult<Arc<dyn LlmProvider>> {
        let api_key = config.get_llm_api_key()?;
        let default_base_url = match config.llm.provider.as_str() {
            "moonshot" => MOONSHOT_BASE_URL,
            "openai" => OPENAI_BASE_URL,
            provider => {
                return Err(ConfigError::InvalidConfig(format!(
                    "Unsupported LLM provider: {provider}"
                ))
                .into())
            }
        };

        let provider = OpenAiProvider::new(OpenAiConfig {
            provider_name: config.llm.provider.clone(),
            api_key,
            base_url: config
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url.to_string()),
            timeout: Duration::from_secs(config.llm.timeout_secs),
        })?;
        Ok(Arc::new(provider))
    }
}

/// Speech factory; `None` when speech input is not configured
struct SpeechRecognizerFactory;

impl SpeechRecognizerFactory {
    fn create_recognizer(config: &TriageConfig) -> TriageResult<Option<Arc<dyn SpeechRecognizer>>> {
        let (Some(section), Some(api_key)) = (config.enabled_speech(), config.get_speech_api_key()?)
        else {
            return Ok(None);
        };
        Ok(Some(build_recognizer(section, api_key)?))
    }
}

fn handle_config_command(config: &TriageConfig, show: bool) -> TriageResult<()> {
    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| TriageError::internal_error(format!("failed to render config: {e}")))?;
        println!("Current configuration:");
        println!("{rendered}");
    }

    info!("Configuration validation complete");
    Ok(())
}
