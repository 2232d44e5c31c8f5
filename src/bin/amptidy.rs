//! amptidy - amplicon OTU table tidying, filtering and ordination CLI

use amplicon_tidy::data::{InputPaths, Inputs, TaxonomyTable};
use amplicon_tidy::error::Result;
use amplicon_tidy::filter::{annotate_depth, annotate_prevalence, remove_organelles};
use amplicon_tidy::ordination::Distance;
use amplicon_tidy::pipeline::{Pipeline, PipelineConfig};
use amplicon_tidy::profile::{profile_depth, profile_prevalence};
use amplicon_tidy::reshape::reshape;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};
use std::path::PathBuf;

/// CLI-friendly distance enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDistance {
    /// Bray-Curtis dissimilarity
    BrayCurtis,
    /// Euclidean distance
    Euclidean,
}

impl From<CliDistance> for Distance {
    fn from(distance: CliDistance) -> Self {
        match distance {
            CliDistance::BrayCurtis => Distance::BrayCurtis,
            CliDistance::Euclidean => Distance::Euclidean,
        }
    }
}

/// Amplicon OTU table tidying and ordination
#[derive(Parser)]
#[command(name = "amptidy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: reshape, filter, plot, ordinate
    Run {
        /// Path to OTU abundance matrix TSV
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to sample metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Path to taxonomy table (binary, or .tsv)
        #[arg(short, long)]
        taxonomy: PathBuf,

        /// Pipeline configuration YAML; command-line options override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Prevalence threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Distance used for the ordination
        #[arg(long, value_enum)]
        distance: Option<CliDistance>,

        /// Number of ordination axes
        #[arg(long)]
        axes: Option<usize>,

        /// Output path for the ordination coordinates TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the filtered, log-transformed observation table
        #[arg(long)]
        observations: Option<PathBuf>,

        /// Write the prevalence plot (SVG)
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Profile sequencing depth and OTU prevalence
    Profile {
        /// Path to OTU abundance matrix TSV
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to sample metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Path to taxonomy table (binary, or .tsv)
        #[arg(short, long)]
        taxonomy: PathBuf,

        /// Prevalence threshold used to assign Keep/Discard
        #[arg(long, default_value = "0.05")]
        threshold: f64,

        /// Output format: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Convert a taxonomy TSV into the binary taxonomy table
    Taxonomy {
        /// Taxonomy TSV (columns: variable, Kingdom .. Species)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the binary table
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write an example pipeline configuration
    Example {
        /// Output path for the YAML configuration
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            counts,
            metadata,
            taxonomy,
            config,
            threshold,
            distance,
            axes,
            output,
            observations,
            plot,
        } => cmd_run(
            InputPaths {
                counts,
                metadata,
                taxonomy,
            },
            config.as_ref(),
            RunOverrides {
                threshold,
                distance: distance.map(Distance::from),
                axes,
                plot,
            },
            &output,
            observations.as_ref(),
        ),
        Commands::Profile {
            counts,
            metadata,
            taxonomy,
            threshold,
            format,
        } => cmd_profile(
            &InputPaths {
                counts,
                metadata,
                taxonomy,
            },
            threshold,
            &format,
        ),
        Commands::Taxonomy { input, output } => cmd_taxonomy(&input, &output),
        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Options given on the command line take precedence over the config file.
struct RunOverrides {
    threshold: Option<f64>,
    distance: Option<Distance>,
    axes: Option<usize>,
    plot: Option<PathBuf>,
}

fn cmd_run(
    paths: InputPaths,
    config_path: Option<&PathBuf>,
    overrides: RunOverrides,
    output_path: &PathBuf,
    observations_path: Option<&PathBuf>,
) -> Result<()> {
    let mut pipeline = match config_path {
        Some(path) => {
            info!("Loading pipeline configuration from {}", path.display());
            let config_str = std::fs::read_to_string(path)?;
            Pipeline::from_config(&PipelineConfig::from_yaml(&config_str)?)
        }
        None => Pipeline::new().name("amptidy"),
    };
    if let Some(threshold) = overrides.threshold {
        pipeline = pipeline.prevalence_threshold(threshold);
    }
    if let Some(distance) = overrides.distance {
        pipeline = pipeline.distance(distance);
    }
    if let Some(axes) = overrides.axes {
        pipeline = pipeline.n_axes(axes);
    }
    if let Some(plot) = overrides.plot {
        pipeline = pipeline.plot_to(plot);
    }

    let inputs = Inputs::load(&paths)?;
    let output = pipeline.run_inputs(&inputs)?;
    eprintln!("{}", output.filter_result);

    if let Some(path) = observations_path {
        output.transformed.to_tsv(path)?;
        info!(
            "Wrote {} observations to {}",
            output.transformed.len(),
            path.display()
        );
    }

    match &output.ordination {
        Some(ordination) => {
            ordination.to_tsv(output_path, Some(&inputs.metadata))?;
            info!(
                "Wrote {} axes for {} samples to {}",
                ordination.n_axes(),
                ordination.sample_ids.len(),
                output_path.display()
            );
        }
        None => warn!(
            "No ordination produced; {} not written",
            output_path.display()
        ),
    }

    Ok(())
}

fn cmd_profile(paths: &InputPaths, threshold: f64, format: &str) -> Result<()> {
    let inputs = Inputs::load(paths)?;
    let table = reshape(&inputs.counts, &inputs.metadata, &inputs.taxonomy)?;
    let annotated = annotate_prevalence(&annotate_depth(&remove_organelles(&table)), threshold)?;

    let depth = profile_depth(&annotated)?;
    let prevalence = profile_prevalence(&annotated)?;

    let profile = serde_json::json!({
        "dimensions": {
            "n_otus": inputs.counts.n_otus(),
            "n_samples": inputs.counts.n_samples(),
            "n_observations": annotated.len()
        },
        "depth": {
            "mean": depth.mean,
            "median": depth.median,
            "min": depth.min,
            "max": depth.max,
            "cv": depth.cv
        },
        "prevalence": {
            "threshold": threshold,
            "n_otus": prevalence.n_otus(),
            "mean": prevalence.mean_prevalence,
            "median": prevalence.median_prevalence,
            "n_keep": prevalence.n_keep,
            "n_discard": prevalence.n_discard
        }
    });

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&profile)?),
        "yaml" => println!("{}", serde_yaml::to_string(&profile)?),
        _ => {
            println!(
                "Dimensions: {} OTUs x {} samples ({} observations after reshaping and organelle removal)",
                inputs.counts.n_otus(),
                inputs.counts.n_samples(),
                annotated.len()
            );
            println!();
            print!("{}", depth);
            println!();
            print!("{}", prevalence);
        }
    }

    Ok(())
}

fn cmd_taxonomy(input: &PathBuf, output: &PathBuf) -> Result<()> {
    let table = TaxonomyTable::from_tsv(input)?;
    table.to_bincode(output)?;
    info!(
        "Wrote binary taxonomy for {} OTUs to {}",
        table.len(),
        output.display()
    );
    Ok(())
}

fn cmd_example(output: &PathBuf) -> Result<()> {
    let config = Pipeline::new()
        .name("amplicon-survey")
        .plot_to("prevalence.svg")
        .to_config(Some(
            "Organelle removal, 5% prevalence filter, Bray-Curtis PCoA",
        ));
    std::fs::write(output, config.to_yaml()?)?;
    info!("Wrote example configuration to {}", output.display());
    Ok(())
}
