use anyhow::{Context, Result};
use cdli_scraper::client::{CatalogClient, CatalogObserver};
use cdli_scraper::config::{
    find_config_file, get_config, load_config, save_config, Config, CONFIG_FILE_NAME,
};
use cdli_scraper::models::{
    ArtifactId, BibliographyFormat, FormatSelector, InscriptionFormat, LinkedDataFormat,
    TabularFormat,
};
use cdli_scraper::utils::{
    save_output, table_preview, table_summary, truncate_csv, Output, OutputName,
    ProgressObserver, DEFAULT_TRUNCATE_LIMIT,
};
use clap::{Parser, Subcommand};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rows shown when previewing a table in the terminal
const PREVIEW_ROWS: usize = 10;

/// CDLI Scraper - Fetch artifact records, linked data, bibliographies,
/// inscriptions and bulk exports from the CDLI catalog
#[derive(Parser, Debug)]
#[command(name = "cdli-scraper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch artifact records and exports from the CDLI catalog", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long = "config", global = true)]
    config_path: Option<PathBuf>,

    /// Catalog origin to query instead of the configured one
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory results are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Attempts per request before giving up
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Print results to stdout instead of writing files
    #[arg(long, global = true)]
    stdout: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch artifact metadata as JSON
    Metadata {
        /// Artifact identifier (e.g. P000001)
        id: String,

        /// Output file (default: metadata_<id>.json in the output directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Fetch linked data (jsonld, rdf, turtle)
    #[command(alias = "ld")]
    LinkedData {
        id: String,

        #[arg(long, short, default_value = "jsonld")]
        format: String,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Fetch an artifact's bibliography (bibtex, csl, ris)
    #[command(alias = "bib")]
    Bibliography {
        id: String,

        #[arg(long, short, default_value = "bibtex")]
        format: String,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Fetch an artifact's inscription (atf, cdli-conll, conll-u)
    Inscription {
        id: String,

        #[arg(long, short, default_value = "atf")]
        format: String,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Download a single tabular export (csv, tsv, xlsx)
    Export {
        /// Export to request
        #[arg(long = "type", default_value = "artifacts")]
        export_type: String,

        #[arg(long, short, default_value = "csv")]
        format: String,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Download every artifact page by page
    ExportAll {
        #[arg(long, short, default_value = "csv")]
        format: String,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Fetch metadata, linked data, bibliography, inscription and the
    /// artifacts export for one artifact, saving each to the output directory
    Scrape { id: String },

    /// Keep the header and first rows of a CSV file
    Truncate {
        input: PathBuf,

        /// Output file (default: limited_<input name>)
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[arg(long, short, default_value_t = DEFAULT_TRUNCATE_LIMIT)]
        limit: usize,
    },

    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a configuration file with default values
    Init {
        /// Destination (default: ./cdli-scraper.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// Where and how results are delivered
struct Delivery {
    directory: PathBuf,
    stdout: bool,
    quiet: bool,
}

impl Delivery {
    fn deliver(&self, output: Output, name: OutputName<'_>, explicit: Option<PathBuf>) -> Result<()> {
        if self.stdout {
            return print_output(&output);
        }

        let path = explicit.unwrap_or_else(|| name.path_in(&self.directory));
        save_output(&output, &path)
            .with_context(|| format!("Failed to save {}", path.display()))?;

        if !self.quiet {
            if let Output::Table(table) = &output {
                eprintln!("{}", table_summary(table));
                if std::io::stdout().is_terminal() && !table.is_empty() {
                    println!("{}", table_preview(table, PREVIEW_ROWS));
                }
            }
            eprintln!("Saved {}", path.display());
        }
        Ok(())
    }
}

fn print_output(output: &Output) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match output {
        Output::Table(table) => table.write_csv(&mut handle)?,
        Output::Json(value) => {
            serde_json::to_writer_pretty(&mut handle, value)?;
            writeln!(handle)?;
        }
        Output::Text(text) => handle.write_all(text.as_bytes())?,
    }
    handle.flush()?;
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = &cli.config_path {
        load_config(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else if let Some(path) = find_config_file() {
        load_config(&path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        get_config()?
    };

    if let Some(base_url) = &cli.base_url {
        config.catalog.base_url = base_url.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if let Some(max_retries) = cli.max_retries {
        config.retry.max_attempts = max_retries;
    }
    Ok(config)
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("cdli_scraper={}", level)),
    );
    let json = config.logging.is_json();

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

/// Fetch and save every record kind for one artifact, stopping at the first failure
async fn scrape(client: &CatalogClient, delivery: &Delivery, id: &ArtifactId) -> Result<()> {
    tracing::info!("Attempting to scrape data for artifact ID: {}", id);

    let metadata = client.get_metadata(id).await?;
    delivery.deliver(metadata.into(), OutputName::Metadata(id), None)?;
    tracing::info!("Successfully retrieved and saved metadata for {}", id);

    let format = LinkedDataFormat::default();
    let linked_data = client.get_linked_data(id, format).await?;
    delivery.deliver(linked_data.into(), OutputName::LinkedData(id, format), None)?;
    tracing::info!("Successfully retrieved and saved linked data for {}", id);

    let format = BibliographyFormat::default();
    let bibliography = client.get_bibliography(id, format).await?;
    delivery.deliver(bibliography.into(), OutputName::Bibliography(id, format), None)?;
    tracing::info!("Successfully retrieved and saved bibliography for {}", id);

    let format = InscriptionFormat::default();
    let inscription = client.get_inscription(id, format).await?;
    delivery.deliver(inscription.into(), OutputName::Inscription(id, format), None)?;
    tracing::info!("Successfully retrieved and saved inscription for {}", id);

    let export = client
        .get_tabular_export("artifacts", TabularFormat::default())
        .await?;
    delivery.deliver(export.into(), OutputName::TabularExport("artifacts"), None)?;
    tracing::info!("Successfully retrieved and saved tabular export");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_tracing(&cli, &config);

    let delivery = Delivery {
        directory: config.output.directory.clone(),
        stdout: cli.stdout,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Metadata { id, output } => {
            let client = CatalogClient::with_config(&config)?;
            let id = ArtifactId::new(id)?;
            let metadata = client.get_metadata(&id).await?;
            delivery.deliver(metadata.into(), OutputName::Metadata(&id), output)?;
        }

        Commands::LinkedData { id, format, output } => {
            let client = CatalogClient::with_config(&config)?;
            let id = ArtifactId::new(id)?;
            let format = LinkedDataFormat::from_tag(&format);
            let data = client.get_linked_data(&id, format).await?;
            delivery.deliver(data.into(), OutputName::LinkedData(&id, format), output)?;
        }

        Commands::Bibliography { id, format, output } => {
            let client = CatalogClient::with_config(&config)?;
            let id = ArtifactId::new(id)?;
            let format = BibliographyFormat::from_tag(&format);
            let text = client.get_bibliography(&id, format).await?;
            delivery.deliver(text.into(), OutputName::Bibliography(&id, format), output)?;
        }

        Commands::Inscription { id, format, output } => {
            let client = CatalogClient::with_config(&config)?;
            let id = ArtifactId::new(id)?;
            let format = InscriptionFormat::from_tag(&format);
            let text = client.get_inscription(&id, format).await?;
            delivery.deliver(text.into(), OutputName::Inscription(&id, format), output)?;
        }

        Commands::Export {
            export_type,
            format,
            output,
        } => {
            let client = CatalogClient::with_config(&config)?;
            let format = TabularFormat::from_tag(&format);
            let table = client.get_tabular_export(&export_type, format).await?;
            delivery.deliver(
                table.into(),
                OutputName::TabularExport(&export_type),
                output,
            )?;
        }

        Commands::ExportAll { format, output } => {
            let format = TabularFormat::from_tag(&format);
            let show_progress = !cli.quiet && std::io::stderr().is_terminal();
            let progress = Arc::new(if show_progress {
                ProgressObserver::new("Exporting artifacts")
            } else {
                ProgressObserver::hidden()
            });

            let client = CatalogClient::with_config(&config)?
                .with_observer(progress.clone() as Arc<dyn CatalogObserver>);
            let result = client.get_all_artifacts(format).await;
            match &result {
                Ok(table) => progress.finish(&format!("{} records", table.len())),
                Err(_) => progress.finish("failed"),
            }
            delivery.deliver(result?.into(), OutputName::AllArtifacts, output)?;
        }

        Commands::Scrape { id } => {
            let client = CatalogClient::with_config(&config)?;
            let id = ArtifactId::new(id)?;
            if let Err(e) = scrape(&client, &delivery, &id).await {
                tracing::error!("An error occurred during scraping: {}", e);
                return Err(e);
            }
            tracing::info!("Scraping completed successfully.");
        }

        Commands::Truncate {
            input,
            output,
            limit,
        } => {
            let output = output.unwrap_or_else(|| limited_path(&input));
            let table = truncate_csv(&input, &output, limit)
                .with_context(|| format!("Failed to truncate {}", input.display()))?;
            if !cli.quiet {
                eprintln!(
                    "Successfully created {} with {} rows",
                    output.display(),
                    table.len()
                );
                eprintln!("Columns: {}", table.columns().join(", "));
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => {
                let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                save_config(&Config::default(), &path)?;
                if !cli.quiet {
                    eprintln!("Wrote {}", path.display());
                }
            }
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        },
    }

    Ok(())
}

/// `dir/limited_<name>` next to the input file
fn limited_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifacts.csv".to_string());
    input.with_file_name(format!("limited_{}", name))
}
