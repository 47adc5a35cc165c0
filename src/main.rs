use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use quercus_io::{RunName, RunWriter, TabularReader};
use quercus_rf::{
    ConfusionMatrix, Dataset, HyperparameterTuner, Metric, ParameterGrid, RandomForestConfig,
    train_test_split,
};

#[derive(Parser)]
#[command(name = "quercus")]
#[command(about = "Random Forest classification for mixed numeric/categorical tabular data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train a forest on a CSV dataset and evaluate it on a held-out split
    Train {
        /// Input CSV (header row, last column is the binary target)
        #[arg(long)]
        data: PathBuf,

        /// Comma-separated categorical column indices
        #[arg(long, value_delimiter = ',')]
        categorical: Vec<usize>,

        /// Fraction of samples held out for testing
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        /// Number of trees in the ensemble
        #[arg(long, default_value_t = 100)]
        trees: usize,

        /// Maximum tree depth (omit for unlimited)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Minimum samples required to attempt a split
        #[arg(long, default_value_t = 2)]
        min_samples_split: usize,

        /// Attributes considered per split (default: ceil(sqrt(n_features)))
        #[arg(long)]
        max_features: Option<usize>,

        /// Directory for run artifacts
        #[arg(long, default_value = "outputs")]
        output_dir: PathBuf,

        /// Run name used to prefix artifact files
        #[arg(long, default_value = "run")]
        run_name: String,

        /// Also write a DOT visualisation of the given tree index
        #[arg(long)]
        visualize_tree: Option<usize>,
    },
    /// Grid-search hyperparameters with k-fold cross-validation
    Tune {
        /// Input CSV (header row, last column is the binary target)
        #[arg(long)]
        data: PathBuf,

        /// Comma-separated categorical column indices
        #[arg(long, value_delimiter = ',')]
        categorical: Vec<usize>,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 5)]
        folds: usize,

        /// Metric to optimise: accuracy, precision, recall, or f1
        #[arg(long, default_value = "accuracy")]
        metric: String,

        /// Candidate tree counts
        #[arg(long, value_delimiter = ',', default_values_t = [50, 100])]
        trees: Vec<usize>,

        /// Candidate max depths ("none" for unlimited)
        #[arg(long, value_delimiter = ',', default_values_t = ["5".to_string(), "10".to_string(), "none".to_string()])]
        max_depth: Vec<String>,

        /// Candidate min-samples-split values
        #[arg(long, value_delimiter = ',', default_values_t = [2, 5])]
        min_samples_split: Vec<usize>,

        /// Candidate max-features values (default: ceil(sqrt(n_features)))
        #[arg(long, value_delimiter = ',')]
        max_features: Vec<usize>,

        /// Directory for run artifacts
        #[arg(long, default_value = "outputs")]
        output_dir: PathBuf,

        /// Run name used to prefix artifact files
        #[arg(long, default_value = "run")]
        run_name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Train {
            data,
            categorical,
            test_fraction,
            trees,
            max_depth,
            min_samples_split,
            max_features,
            output_dir,
            run_name,
            visualize_tree,
        } => train(
            &data,
            &categorical,
            test_fraction,
            trees,
            max_depth,
            min_samples_split,
            max_features,
            cli.seed,
            &output_dir,
            run_name,
            visualize_tree,
        ),
        Command::Tune {
            data,
            categorical,
            folds,
            metric,
            trees,
            max_depth,
            min_samples_split,
            max_features,
            output_dir,
            run_name,
        } => tune(
            &data,
            &categorical,
            folds,
            &metric,
            trees,
            max_depth,
            min_samples_split,
            max_features,
            cli.seed,
            &output_dir,
            run_name,
        ),
    }
}

/// Load the CSV and bind it to the learning crate's dataset contract.
fn load_dataset(data: &Path, categorical: &[usize]) -> Result<Dataset> {
    let table = TabularReader::new(data)
        .read()
        .with_context(|| format!("loading {}", data.display()))?;
    let (names, features, labels) = table.into_parts();
    let categorical: BTreeSet<usize> = categorical.iter().copied().collect();
    let dataset =
        Dataset::new(features, labels, Some(names), categorical).context("constructing dataset")?;
    info!(
        n_samples = dataset.n_samples(),
        n_features = dataset.n_features(),
        "dataset ready"
    );
    Ok(dataset)
}

fn default_max_features(n_features: usize) -> usize {
    (n_features as f64).sqrt().ceil() as usize
}

#[allow(clippy::too_many_arguments)]
fn train(
    data: &Path,
    categorical: &[usize],
    test_fraction: f64,
    trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: Option<usize>,
    seed: u64,
    output_dir: &Path,
    run_name: String,
    visualize_tree: Option<usize>,
) -> Result<()> {
    let dataset = load_dataset(data, categorical)?;
    let max_features = max_features.unwrap_or_else(|| default_max_features(dataset.n_features()));

    let (train_set, test_set) = train_test_split(&dataset, test_fraction, seed)?;
    info!(
        n_train = train_set.n_samples(),
        n_test = test_set.n_samples(),
        "dataset split"
    );

    let forest = RandomForestConfig::new(trees)?
        .with_max_depth(max_depth)
        .with_min_samples_split(min_samples_split)
        .with_max_features(Some(max_features))
        .with_seed(seed)
        .fit(&train_set)?;

    let train_accuracy = forest.score(&train_set)?;

    let mut predictions = Vec::with_capacity(test_set.n_samples());
    let mut probabilities = Vec::with_capacity(test_set.n_samples());
    for i in 0..test_set.n_samples() {
        predictions.push(forest.predict(test_set.sample(i))?);
        probabilities.push(forest.predict_proba(test_set.sample(i))?);
    }
    let actuals = test_set.labels();
    let confusion = ConfusionMatrix::from_predictions(&predictions, &actuals)?;

    info!(
        train_accuracy,
        test_accuracy = confusion.accuracy(),
        "training complete"
    );

    let writer = RunWriter::new(output_dir, RunName::new(run_name)?)?;
    writer.write_evaluation(
        trees,
        max_depth,
        min_samples_split,
        max_features,
        seed,
        train_accuracy,
        confusion.accuracy(),
        confusion.precision(),
        confusion.recall(),
        confusion.f1(),
        [
            confusion.true_positives,
            confusion.false_positives,
            confusion.true_negatives,
            confusion.false_negatives,
        ],
    )?;
    writer.write_predictions(&predictions, &actuals, &probabilities)?;

    if let Some(tree_index) = visualize_tree {
        match forest.trees().get(tree_index) {
            Some(tree) => {
                writer.write_tree_dot(tree_index, &tree.to_dot(forest.feature_names()))?;
            }
            None => warn!(
                tree_index,
                n_trees = forest.n_trees(),
                "tree index out of bounds, skipping visualisation"
            ),
        }
    }

    println!("Train accuracy: {train_accuracy:.4}");
    println!("Test accuracy:  {:.4}", confusion.accuracy());
    println!("Precision:      {:.4}", confusion.precision());
    println!("Recall:         {:.4}", confusion.recall());
    println!("F1:             {:.4}", confusion.f1());
    println!("{confusion}");

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn tune(
    data: &Path,
    categorical: &[usize],
    folds: usize,
    metric: &str,
    trees: Vec<usize>,
    max_depth: Vec<String>,
    min_samples_split: Vec<usize>,
    max_features: Vec<usize>,
    seed: u64,
    output_dir: &Path,
    run_name: String,
) -> Result<()> {
    let dataset = load_dataset(data, categorical)?;
    let metric: Metric = metric.parse()?;

    let max_depth: Vec<Option<usize>> = max_depth
        .iter()
        .map(|candidate| match candidate.to_ascii_lowercase().as_str() {
            "none" | "unlimited" => Ok(None),
            raw => raw
                .parse::<usize>()
                .map(Some)
                .with_context(|| format!("invalid max-depth candidate \"{raw}\"")),
        })
        .collect::<Result<_>>()?;

    let max_features = if max_features.is_empty() {
        vec![default_max_features(dataset.n_features())]
    } else {
        max_features
    };

    if trees.is_empty() || min_samples_split.is_empty() {
        bail!("candidate axes must not be empty");
    }

    let grid = ParameterGrid::new(trees, max_depth, min_samples_split, max_features)?;
    info!(n_combinations = grid.len(), n_folds = folds, "grid search");

    let tuner = HyperparameterTuner::new(folds)?
        .with_seed(seed)
        .with_metric(metric);
    let result = tuner.tune(&dataset, &grid)?;

    let writer = RunWriter::new(output_dir, RunName::new(run_name)?)?;
    writer.write_tuning(
        result.n_trees,
        result.max_depth,
        result.min_samples_split,
        result.max_features,
        &result.metric.to_string(),
        result.mean_score,
        result.std_score,
        folds,
    )?;

    println!("{result}");

    Ok(())
}
