use ams_converter::config::{parse_min_score, ConverterConfig};
use ams_converter::reference::{FileReferenceSource, ReferenceSource};
use ams_converter::resolver::{Resolution, StoreResolver};
use ams_converter::similarity::Scorer;
use ams_converter::{ams_writer, pipeline, server, spreadsheet};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ams-converter")]
#[command(about = "Convert retailer order extracts into AMS import files")]
struct Args {
    /// Product catalog workbook (or set AMS_CATALOG_PATH)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Store delivery directory workbook (or set AMS_DIRECTORY_PATH)
    #[arg(long, global = true)]
    directory: Option<PathBuf>,

    /// Reject store matches scoring below this (0-100)
    #[arg(long, global = true, value_parser = parse_min_score)]
    min_score: Option<f64>,

    /// Similarity scorer: weighted, jaro-winkler or levenshtein
    #[arg(long, global = true)]
    scorer: Option<Scorer>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an order extract into an AMS file
    Convert {
        /// Order extract (.csv, .xlsx, .xls, .ods)
        orders: PathBuf,

        /// Output path, `.xlsx` or `.csv` (default: the configured output name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print warnings as JSON instead of a summary line
        #[arg(long)]
        json: bool,
    },
    /// Show which store a raw location resolves to
    Resolve {
        location: String,
    },
    /// Run the upload server
    Serve {
        /// Address to bind (or set AMS_BIND_ADDR)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

impl Args {
    fn config(&self) -> Result<ConverterConfig> {
        let mut config = ConverterConfig::from_env()?;
        if let Some(path) = &self.catalog {
            config.catalog_path = path.clone();
        }
        if let Some(path) = &self.directory {
            config.directory_path = path.clone();
        }
        if let Some(score) = self.min_score {
            config.resolver.min_score = Some(score);
        }
        if let Some(scorer) = self.scorer {
            config.resolver.scorer = scorer;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = args.config()?;

    match args.command {
        Command::Convert { orders, output, json } => {
            let source = FileReferenceSource::new(&config.catalog_path, &config.directory_path);
            let reference = source
                .load()
                .with_context(|| format!("loading reference data from {}", source.describe()))?;

            let orders_df = spreadsheet::read_path(&orders)
                .with_context(|| format!("reading order extract {}", orders.display()))?;
            let conversion = pipeline::convert_table(&orders_df, &reference, config.resolver)?;

            let output = output.unwrap_or_else(|| PathBuf::from(&config.output_name));
            ams_writer::write_ams_file(&output, &conversion.rows)?;
            info!("Wrote {} rows to {}", conversion.rows.len(), output.display());

            if json {
                println!("{}", serde_json::to_string_pretty(&conversion.report)?);
            } else {
                println!("{}", conversion.report.summary());
            }
        }
        Command::Resolve { location } => {
            let source = FileReferenceSource::new(&config.catalog_path, &config.directory_path);
            let reference = source.load()?;
            let resolver = StoreResolver::from_directory(&reference.directory, config.resolver);

            match resolver.resolve(Some(location.as_str())) {
                Resolution::Matched { store, score } => println!("{} ({:.1})", store, score),
                Resolution::BelowThreshold { best, score } => {
                    println!("no match: best candidate '{}' scored {:.1}", best, score)
                }
                Resolution::NoLocation => println!("no match: location is blank"),
                Resolution::NoCandidates => println!("no match: store directory is empty"),
            }
        }
        Command::Serve { bind } => {
            if let Some(addr) = bind {
                config.bind_addr = addr;
            }
            server::run(config).await?;
        }
    }

    Ok(())
}
