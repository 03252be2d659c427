use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lineup_baseline::BaselineFactory;
use lineup_core::{spawn_worker, IncrementalOutcome, ModelLifecycle, TrainOutcome, Variant};
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod dataset_dir;

#[derive(Parser, Debug)]
#[command(name = "lineup", about = "Face recognition model lifecycle CLI")]
struct Cli {
    /// Algorithm variant (eigen, fisher, lbph). Overrides LINEUP_VARIANT.
    /// A saved model of another variant is discarded.
    #[arg(long, global = true)]
    variant: Option<Variant>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Train a fresh model from a dataset directory (<dir>/<label>/<photos>)
    Train { dir: PathBuf },
    /// Add one face to the model (lbph only)
    Add {
        image: PathBuf,
        /// Label of the person the face belongs to
        #[arg(short, long)]
        label: i32,
    },
    /// Predict who a face belongs to
    Predict {
        image: PathBuf,
        /// Retrain from this dataset first (eigen and fisher need it after a restart)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Delete the trained model
    Reset,
    /// Switch to another variant, discarding the trained model
    Switch {
        #[arg(value_name = "VARIANT")]
        target: Variant,
    },
    /// Show model status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = config::Config::from_env()?;
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }

    let lifecycle = ModelLifecycle::open(&config.lifecycle_config(), config.variant, BaselineFactory)?;
    let worker = spawn_worker(Arc::new(lifecycle))?;

    match cli.command {
        Commands::Train { dir } => {
            let dataset = dataset_dir::load_dataset(&dir)?;
            match worker.train_full(dataset).await? {
                TrainOutcome::Trained {
                    samples,
                    canonical_size,
                } => {
                    println!("Trained {} model on {samples} faces", config.variant);
                    if let Some(size) = canonical_size {
                        println!("Faces resized to {size}");
                    }
                }
                TrainOutcome::Reset => println!("Dataset has no faces; model reset"),
            }
        }
        Commands::Add { image, label } => match worker.train_incremental(image.clone(), label).await? {
            IncrementalOutcome::Bootstrapped => println!("Created model from {}", image.display()),
            IncrementalOutcome::Updated => println!("Added {} as label {label}", image.display()),
            IncrementalOutcome::Skipped => println!("Could not decode {}; nothing changed", image.display()),
        },
        Commands::Predict { image, dataset } => {
            if let Some(dir) = dataset {
                worker.train_full(dataset_dir::load_dataset(&dir)?).await?;
            }
            let face = image::open(&image)
                .with_context(|| format!("decoding {}", image.display()))?
                .to_luma8();
            let prediction = worker.predict(face).await?;
            if prediction.is_unknown() {
                println!("Unknown face (no trained model)");
            } else {
                println!(
                    "Label {} (distance {:.4})",
                    prediction.label, prediction.confidence
                );
            }
        }
        Commands::Reset => {
            worker.reset().await?;
            println!("Model reset");
        }
        Commands::Switch { target } => {
            let status = worker.set_variant(Some(target)).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Status => {
            let status = worker.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
