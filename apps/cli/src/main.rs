use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    wait_for_terminal, ApiFlavor, GenerationController, HttpVideoApi, Phase, SessionSnapshot,
};
use shared::domain::{FrameRate, GenerationSettings, Quality, VideoSize};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, validate_server_url, Settings};
use render::Renderer;

/// Generate a video from a text prompt and wait for the result.
#[derive(Parser, Debug)]
#[command(name = "vidgen", version)]
struct Args {
    /// Prompt text; several words are joined with spaces.
    #[arg(required = true)]
    prompt: Vec<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long, default_value = "speed")]
    quality: Quality,
    #[arg(long, default_value = "1920x1080")]
    size: VideoSize,
    #[arg(long, default_value = "30")]
    fps: FrameRate,
    #[arg(long)]
    with_audio: bool,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    flavor: Option<ApiFlavor>,
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Config file; defaults to ./vidgen.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print every session snapshot as a JSON line.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply_overrides(&self, settings: &mut Settings) -> Result<()> {
        if let Some(server_url) = &self.server_url {
            validate_server_url(server_url)?;
            settings.server_url = server_url.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(flavor) = self.flavor {
            settings.api_flavor = flavor;
        }
        if let Some(poll_interval_ms) = self.poll_interval_ms {
            settings.poll_interval_ms = poll_interval_ms;
        }
        Ok(())
    }

    fn generation_settings(&self, settings: &Settings) -> GenerationSettings {
        GenerationSettings {
            model: settings.model.clone(),
            quality: self.quality,
            size: self.size,
            fps: self.fps,
            with_audio: self.with_audio,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut settings = load_settings(args.config.as_deref())?;
    args.apply_overrides(&mut settings)?;
    let api = HttpVideoApi::new(&settings.server_url, settings.api_flavor)
        .context("failed to build video api client")?;
    info!(
        server_url = %settings.server_url,
        flavor = %api.flavor(),
        "using generation service"
    );
    let controller = GenerationController::new(Arc::new(api), settings.controller_config());

    let prompt = args.prompt.join(" ");
    let generation = args.generation_settings(&settings);
    let mut renderer = Renderer::new(args.json);

    let outcome = tokio::select! {
        outcome = follow(&controller, &prompt, generation, &mut renderer) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, cancelling generation");
            controller.reset().await;
            None
        }
    };

    Ok(match outcome {
        Some(snapshot) if snapshot.phase() == Phase::Succeeded => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn follow(
    controller: &Arc<GenerationController>,
    prompt: &str,
    settings: GenerationSettings,
    renderer: &mut Renderer,
) -> Result<Option<SessionSnapshot>> {
    // Subscribe first so the Submitting update is not missed.
    let mut events = controller.subscribe();
    controller.submit(prompt, settings).await?;
    Ok(wait_for_terminal(&mut events, |snapshot| renderer.render(snapshot)).await)
}
