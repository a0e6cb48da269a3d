//! mdl-tool - inspect, rewrite and convert model containers

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use mdl_tool::{export_json, import_json, inspect, list_materials, load_config, rewrite};

#[derive(Parser)]
#[command(name = "mdl-tool")]
#[command(about = "Model container codec tool")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, counts and a per-mesh summary
    Inspect {
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the material paths a model references
    Materials {
        input: PathBuf,

        /// Game path of the model (used to resolve short material names)
        #[arg(long)]
        model_path: String,

        /// Material set variant, or -1 for every declared variant
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        variant: i32,

        /// Declared material set variants (comma separated)
        #[arg(long, value_delimiter = ',')]
        variants: Vec<u16>,

        /// Leave out human body skin materials
        #[arg(long)]
        no_skin: bool,
    },

    /// Decode and re-encode a model against itself
    Rewrite {
        input: PathBuf,

        /// Output file (default: overwrite input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codec settings (codec.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Format version to write (5 or 6)
        #[arg(long)]
        target_version: Option<u16>,

        /// Drop shape keys
        #[arg(long)]
        skip_shapes: bool,
    },

    /// Export the geometry model as JSON
    Export {
        input: PathBuf,

        /// Output .json file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encode a JSON geometry model using a donor model
    Import {
        input: PathBuf,

        /// Model whose unknown fields are carried over
        #[arg(long)]
        donor: PathBuf,

        /// Output model file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codec settings (codec.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match cli.command {
        Commands::Inspect { input, json } => {
            let summary = inspect(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{summary}");
            }
        }

        Commands::Materials {
            input,
            model_path,
            variant,
            variants,
            no_skin,
        } => {
            for path in list_materials(&input, &model_path, variant, &variants, !no_skin)? {
                println!("{path}");
            }
        }

        Commands::Rewrite {
            input,
            output,
            config,
            target_version,
            skip_shapes,
        } => {
            let mut config = load_config(config.as_deref())?;
            if target_version.is_some() {
                config.target_version = target_version;
            }
            config.skip_shapes |= skip_shapes;
            let output = output.unwrap_or_else(|| input.clone());
            rewrite(&input, &output, &config)?;
            tracing::info!("Done!");
        }

        Commands::Export { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("json"));
            tracing::info!("Exporting {:?} -> {:?}", input, output);
            export_json(&input, &output)?;
        }

        Commands::Import {
            input,
            donor,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let output = output.unwrap_or_else(|| input.with_extension("mdl"));
            tracing::info!("Encoding {:?} against {:?} -> {:?}", input, donor, output);
            import_json(&input, &donor, &output, &config)?;
            tracing::info!("Done!");
        }
    }

    Ok(())
}
