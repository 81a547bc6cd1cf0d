//! inferlab CLI - classic inference and learning demonstrations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inferlab::{
    AlarmPipeline, Config, InferlabError, MusicianshipPipeline, SentimentPipeline, WaltzPipeline,
};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "inferlab")]
#[command(version)]
#[command(about = "Bayesian networks, Naive Bayes sentiment and Waltz line labeling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Exact and approximate inference on the burglary-alarm network
    Alarm,

    /// Exact and approximate inference on the musicianship network
    Musicianship,

    /// Naive Bayes sentiment classification of movie reviews
    Sentiment {
        /// Corpus root holding pos/ and neg/
        #[arg(long)]
        corpus: Option<String>,

        /// Number of stratified folds
        #[arg(long)]
        folds: Option<usize>,

        /// Use the folds encoded in the corpus file names
        #[arg(long)]
        use_corpus_folds: bool,
    },

    /// Waltz line labeling of the example drawing
    Waltz {
        /// Search without filtering domains first
        #[arg(long)]
        no_filter: bool,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn print_example_config() {
    let example = r#"# inferlab configuration file
# Every key is optional; the values below are the defaults.

[sampling]
seed = 42
preview_samples = 20
rejection_size = 5000        # alarm: samples used to re-learn the network
weighted_size = 2000         # musicianship: likelihood-weighted samples
max_rejection_draws = 10000000

[estimation]
prior = "bdeu"               # "bdeu", "k2" or "none" (maximum likelihood)
equivalent_sample_size = 5.0

[sentiment]
corpus_dir = "txt_sentoken"  # supports ${VAR} expansion
folds = 10
use_corpus_folds = false
min_df = 0.3
max_df = 1.0
sublinear_tf = true
stop_words = true
alpha = 1.0

[waltz]
filter = true

[output]
preview_rows = 5
precision = 4
"#;
    println!("{example}");
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", cli.config))
}

/// Wrap a pipeline failure, hinting at a retry when the data caused it.
fn pipeline_failed(err: InferlabError, context: String) -> anyhow::Error {
    if err.is_data_dependent() {
        warn!("Failure depends on the sampled data; try another seed or a larger max_rejection_draws");
        anyhow::Error::new(err).context(format!(
            "{context} (try another [sampling] seed or a larger max_rejection_draws)"
        ))
    } else {
        anyhow::Error::new(err).context(context)
    }
}

fn emit<R: Serialize + Display>(report: &R, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{text}");
    } else {
        println!("{report}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match &cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = load_config(&cli)?;
            match &cli.config {
                Some(path) => info!("Configuration {} is valid", path.display()),
                None => info!("No configuration file given; built-in defaults are valid"),
            }
            info!(
                "  Sampling: seed {}, {} rejection / {} weighted samples",
                config.sampling.seed, config.sampling.rejection_size, config.sampling.weighted_size
            );
            info!(
                "  Estimation: {:?} prior, ess {}",
                config.estimation.prior, config.estimation.equivalent_sample_size
            );
            info!(
                "  Sentiment: corpus {}, {} folds, min_df {}",
                config.sentiment.corpus_path().display(),
                config.sentiment.folds,
                config.sentiment.min_df
            );
            println!("Configuration is valid");
        }

        Commands::Alarm => {
            let config = load_config(&cli)?;
            let report = AlarmPipeline::new(config)
                .run()
                .map_err(|e| pipeline_failed(e, "Alarm pipeline failed".into()))?;
            emit(&report, cli.json)?;
        }

        Commands::Musicianship => {
            let config = load_config(&cli)?;
            let report = MusicianshipPipeline::new(config)
                .run()
                .map_err(|e| pipeline_failed(e, "Musicianship pipeline failed".into()))?;
            emit(&report, cli.json)?;
        }

        Commands::Sentiment {
            corpus,
            folds,
            use_corpus_folds,
        } => {
            let mut config = load_config(&cli)?;

            // Override config from CLI
            if let Some(corpus) = corpus {
                config.sentiment.corpus_dir = corpus.clone();
            }
            if let Some(folds) = folds {
                config.sentiment.folds = *folds;
            }
            if *use_corpus_folds {
                config.sentiment.use_corpus_folds = true;
            }
            config.validate().context("Invalid command-line override")?;

            let pipeline = SentimentPipeline::new(config);
            let corpus_path = pipeline.corpus_path();
            let report = pipeline.run().map_err(|e| {
                pipeline_failed(
                    e,
                    format!("Sentiment pipeline failed on {}", corpus_path.display()),
                )
            })?;
            emit(&report, cli.json)?;
        }

        Commands::Waltz { no_filter } => {
            let mut config = load_config(&cli)?;
            if *no_filter {
                config.waltz.filter = false;
            }
            let report = WaltzPipeline::new(config)
                .run()
                .map_err(|e| pipeline_failed(e, "Waltz pipeline failed".into()))?;
            emit(&report, cli.json)?;
        }
    }

    Ok(())
}
