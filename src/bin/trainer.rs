use anyhow::Context;
use clap::Parser;
use stresslens::classifier::SoftmaxConfig;
use stresslens::dataset::{Dataset, DEFAULT_TARGET_COLUMN};
use stresslens::training::{train, TrainingConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Train the stress classifier from a labeled CSV", long_about = None)]
struct Args {
    /// Labeled dataset; every column except the target is a feature
    #[clap(short, long, default_value = "data/StressLevelDataset.csv")]
    csv: String,

    #[clap(long, default_value = DEFAULT_TARGET_COLUMN)]
    target: String,

    /// Directory the artifacts and manifest are written to
    #[clap(short, long, default_value = "models")]
    output: String,

    #[clap(long, default_value_t = 0.2)]
    test_size: f64,

    #[clap(long, default_value_t = 42)]
    seed: u64,

    #[clap(long, default_value_t = 500)]
    epochs: usize,

    #[clap(long, default_value_t = 0.1)]
    learning_rate: f64,

    #[clap(long, default_value_t = 1e-3)]
    l2: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let dataset = Dataset::from_path(&args.csv, &args.target)
        .with_context(|| format!("loading {}", args.csv))?;

    let config = TrainingConfig {
        test_fraction: args.test_size,
        seed: args.seed,
        softmax: SoftmaxConfig {
            epochs: args.epochs,
            learning_rate: args.learning_rate,
            l2: args.l2,
        },
    };

    let outcome = train(&dataset, &config)?;
    let accuracy = outcome.report.as_ref().map(|r| r.accuracy);
    let manifest = outcome
        .artifacts
        .save(&args.output, accuracy)
        .with_context(|| format!("saving artifacts to {}", args.output))?;

    info!("Model saved successfully!");
    for (file, sha) in &manifest.files {
        info!("  {}/{file}  sha256={sha}", args.output);
    }

    Ok(())
}
