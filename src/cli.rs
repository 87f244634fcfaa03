use crate::artifacts::ModelArtifacts;
use crate::config::{load_config, ServiceConfig};
use crate::inference::InferenceEngine;
use crate::schema::RawInput;
use crate::web::{self, AppState, FeaturesResponse, PredictionResponse};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};

/// Top-level CLI for the stress prediction service
#[derive(Parser)]
#[command(name = "stresslens", version, about = "Student stress risk prediction service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API (/health, /predict, /features)
    Serve {
        /// Host/IP to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
        /// Directory holding the trained artifacts
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// Score one JSON object of features read from a file, or stdin with "-"
    Predict {
        #[arg(short, long, default_value = "-")]
        input: String,
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// Print the feature schema and descriptions
    Features {
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
}

fn config_with(artifacts: Option<PathBuf>) -> anyhow::Result<ServiceConfig> {
    let mut config = load_config().context("loading configuration")?;
    if let Some(dir) = artifacts {
        config.artifacts_dir = dir;
    }
    config.validate()?;
    Ok(config)
}

/// Load artifacts and build the engine described by `config`
pub fn build_engine(config: &ServiceConfig) -> anyhow::Result<InferenceEngine> {
    let artifacts = ModelArtifacts::load(&config.artifacts_dir).with_context(|| {
        format!(
            "loading model artifacts from {}",
            config.artifacts_dir.display()
        )
    })?;
    let engine = InferenceEngine::from_artifacts(artifacts, config.top_factors)?
        .with_strict_ranges(config.strict_ranges);
    Ok(engine)
}

fn read_input(input: &str) -> anyhow::Result<String> {
    let mut text = String::new();
    if input == "-" {
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
    } else {
        text = std::fs::read_to_string(input).with_context(|| format!("reading {input}"))?;
    }
    Ok(text)
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            host,
            port,
            artifacts,
        } => {
            let mut config = config_with(artifacts)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let state = match build_engine(&config) {
                Ok(engine) => AppState::new(engine),
                Err(e) => {
                    error!("Serving without a model: {e:#}");
                    AppState::without_model()
                }
            };

            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building Tokio runtime")?;
            rt.block_on(web::serve(&config, state))?;
            info!("Server stopped");
        }
        Commands::Predict { input, artifacts } => {
            let config = config_with(artifacts)?;
            let engine = build_engine(&config)?;

            let text = read_input(&input)?;
            let value: serde_json::Value =
                serde_json::from_str(&text).context("input is not valid JSON")?;
            let raw = RawInput::from_json(value)?;
            let result = engine.infer(&raw)?;

            let response = PredictionResponse::from(result);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Features { artifacts } => {
            let config = config_with(artifacts)?;
            let engine = build_engine(&config)?;
            let response = FeaturesResponse::from_schema(engine.schema());
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}
