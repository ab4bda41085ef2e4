use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use burn::config::Config;
use burn::tensor::backend::Backend;
use clap::Parser;
use neural_refine::data::{DirectoryDataset, IMAGE_SIZE};
use neural_refine::{PoseRefinerTrainer, RotationGradient, TrainBackend, TrainingConfig};

#[derive(Parser, Debug)]
#[command(name = "train_refiner", about = "Pose refiner training loop")]
struct TrainArgs {
    /// JSON training config; the flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Dataset root containing one directory per class label.
    #[arg(long)]
    root_dir: Option<String>,
    /// Comma-separated class labels (e.g. "ape,can,cat").
    #[arg(long, value_delimiter = ',')]
    classes: Vec<String>,
    /// Number of epochs to run.
    #[arg(long)]
    epochs: Option<usize>,
    /// Validation fraction (0..1).
    #[arg(long)]
    valid_fraction: Option<f64>,
    /// Adam learning rate.
    #[arg(long)]
    lr: Option<f64>,
    /// Adam weight decay.
    #[arg(long)]
    weight_decay: Option<f64>,
    /// Losses at or above this value are skipped.
    #[arg(long)]
    outlier_threshold: Option<f64>,
    /// Points sampled per loss evaluation.
    #[arg(long)]
    num_points: Option<usize>,
    /// Checkpoint path for the best model.
    #[arg(long)]
    checkpoint: Option<String>,
    /// Seed for the split, shuffles and point sampling.
    #[arg(long)]
    seed: Option<u64>,
    /// Keep point clouds in memory after the first read.
    #[arg(long, default_value_t = false)]
    cache_point_clouds: bool,
    /// Backpropagate through the quaternion conversion.
    #[arg(long, default_value_t = false)]
    differentiable_rotation: bool,
    /// Side length images are resized to.
    #[arg(long, default_value_t = IMAGE_SIZE)]
    image_size: u32,
}

fn build_config(args: &TrainArgs) -> Result<TrainingConfig> {
    let mut config = match &args.config {
        Some(path) => TrainingConfig::load(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => {
            let Some(root_dir) = args.root_dir.clone() else {
                bail!("either --config or --root-dir is required");
            };
            if args.classes.is_empty() {
                bail!("--classes is required without --config");
            }
            TrainingConfig::new(root_dir, args.classes.clone())
        }
    };

    if let Some(root_dir) = &args.root_dir {
        config.root_dir = root_dir.clone();
    }
    if !args.classes.is_empty() {
        config.classes = args.classes.clone();
    }
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(valid_fraction) = args.valid_fraction {
        config.valid_fraction = valid_fraction;
    }
    if let Some(lr) = args.lr {
        config.learning_rate = lr;
    }
    if let Some(weight_decay) = args.weight_decay {
        config.weight_decay = weight_decay;
    }
    if let Some(threshold) = args.outlier_threshold {
        config.outlier_threshold = threshold;
    }
    if let Some(num_points) = args.num_points {
        config.num_points = num_points;
    }
    if let Some(checkpoint) = &args.checkpoint {
        config.checkpoint_path = checkpoint.clone();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.cache_point_clouds {
        config.cache_point_clouds = true;
    }
    if args.differentiable_rotation {
        config.rotation_gradient = RotationGradient::Differentiable;
    }

    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = TrainArgs::parse();
    let config = build_config(&args)?;
    let device = <TrainBackend as Backend>::Device::default();

    let dataset = DirectoryDataset::open(&config.root_dir, &config.classes)
        .context("failed to index dataset")?
        .with_image_size(args.image_size);
    let model = config.model.init::<TrainBackend>(&device);

    let mut trainer = PoseRefinerTrainer::<TrainBackend, _>::new(model, config, &device)?;
    let session = trainer.fit(&dataset)?;

    log::info!(
        "Finished {} epochs; best validation loss {:.6} saved to {}",
        session.epochs_completed(),
        session.best_validation_loss(),
        trainer.config().checkpoint_path
    );

    Ok(())
}
