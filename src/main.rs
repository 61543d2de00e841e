use anyhow::{Context, Result};
use clap::Parser;
use sage_voice::tools::StudyToolRouter;
use sage_voice::{AppState, Config, SessionManager, SpeechClient, SpeechSettings, WsEndpoint};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "sage-voice", about = "Voice session pipeline for the Sage study assistant")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/sage-voice")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Arc::new(Config::load(&args.config)?);

    info!("Sage Voice v0.1.0");
    info!("Loaded config: {}", cfg.service.name);

    let api_key = std::env::var(&cfg.live.api_key_env).unwrap_or_else(|_| {
        warn!(
            "{} not set; live sessions will fail to authenticate",
            cfg.live.api_key_env
        );
        String::new()
    });

    let endpoint = Arc::new(WsEndpoint::new(cfg.live.endpoint.clone(), api_key.clone()));

    let speech = Arc::new(SpeechClient::new(
        SpeechSettings {
            endpoint: cfg.speech.endpoint.clone(),
            model: cfg.speech.model.clone(),
            voice_name: cfg.speech.voice.clone(),
            max_chars: cfg.speech.max_chars,
            ..SpeechSettings::default()
        },
        api_key,
    ));

    // Navigation intents from tool calls; the UI surface drains these.
    let (nav_tx, mut nav_rx) = mpsc::channel(16);
    tokio::spawn(async move {
        while let Some(intent) = nav_rx.recv().await {
            info!("Navigation intent: {:?}", intent);
        }
    });

    let tools = Arc::new(StudyToolRouter::new(nav_tx));
    let manager = Arc::new(SessionManager::new(endpoint, tools));

    let state = AppState::new(manager, Arc::clone(&cfg), speech);
    let router = sage_voice::create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
