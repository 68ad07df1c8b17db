use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use querygate::schema::JsonMetadataSource;
use querygate::{InMemoryBackend, MetadataStore, SearchMetrics, SearchRequest, SearchService, SearchSettings};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "querygate")]
#[command(about = "Metadata-driven search query compiler", long_about = None)]
struct Args {
    /// Metadata document (entities and access rules) in JSON
    #[arg(long, env = "QUERYGATE_METADATA")]
    metadata: PathBuf,

    /// JSON array of documents served by the in-memory backend
    #[arg(long, env = "QUERYGATE_DOCUMENTS")]
    documents: Option<PathBuf>,

    /// Search settings in JSON; missing keys keep their defaults
    #[arg(long, env = "QUERYGATE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Print Prometheus metrics after the command
    #[arg(long, env = "QUERYGATE_PRINT_METRICS")]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a search request
    Search {
        /// Root entity to search
        #[arg(long)]
        entity: String,

        /// Request file in JSON; reads stdin when omitted
        #[arg(long)]
        request: Option<PathBuf>,
    },
    /// List the properties of an entity with their physical paths
    Describe {
        #[arg(long)]
        entity: String,
    },
    /// Show the access-rule conditions in force for an entity
    Policy {
        #[arg(long)]
        entity: String,
    },
}

fn read_request(path: Option<&PathBuf>) -> Result<SearchRequest> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading request {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    Ok(serde_json::from_str(&text).context("parsing search request")?)
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Starting QueryGate v{}", querygate::VERSION);

    let settings = match &args.settings {
        Some(path) => SearchSettings::load(path)?,
        None => SearchSettings::default(),
    };

    let source = JsonMetadataSource::new(&args.metadata);
    let store = Arc::new(
        MetadataStore::from_source(&source)
            .with_context(|| format!("loading metadata from {}", args.metadata.display()))?,
    );
    info!(
        entities = store.load().entities().len(),
        rules = store.load().rules().len(),
        "metadata loaded"
    );

    let backend = match &args.documents {
        Some(path) => InMemoryBackend::load(path)
            .with_context(|| format!("loading documents from {}", path.display()))?,
        None => InMemoryBackend::new(),
    };
    info!(documents = backend.len(), "backend ready");

    let metrics = SearchMetrics::new()?;
    let service = SearchService::new(store, backend)
        .with_settings(settings)
        .with_metrics(metrics.clone());

    let output = match &args.command {
        Command::Search { entity, request } => {
            let request = read_request(request.as_ref())?;
            serde_json::to_string_pretty(&service.search(entity, request)?)?
        }
        Command::Describe { entity } => serde_json::to_string_pretty(&service.describe(entity)?)?,
        Command::Policy { entity } => {
            serde_json::to_string_pretty(&service.security_conditions(entity)?)?
        }
    };
    println!("{}", output);

    if args.print_metrics {
        print!("{}", metrics.encode()?);
    }

    Ok(())
}
