use anyhow::Context;
use apod_search::{
    config::Config,
    connection::{ConnectionManager, ConnectionPolicy},
    config::EmbeddingConfig,
    embedding::{create_embedder, Embedder},
    indexing::{index_corpus, IndexSchema, RetryPolicy, SchemaKind},
    models::load_documents,
    store::create_connector,
    telemetry::init_tracing,
};
use clap::{Parser, Subcommand, ValueEnum};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "apod-cli")]
#[command(about = "APOD search CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "APOD_ENDPOINT", default_value = "http://localhost:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchMode {
    Regular,
    Prefix,
    Semantic,
}

impl SearchMode {
    fn path(self) -> &'static str {
        match self {
            SearchMode::Regular => "regular_search",
            SearchMode::Prefix => "prefix_search",
            SearchMode::Semantic => "semantic_search",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Recreate an index and load a JSON collection into it
    Index {
        /// JSON array of APOD records
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// standard, edge_ngram or dense_vector
        #[arg(short, long, default_value = "standard")]
        schema: SchemaKind,

        /// Index name; defaults to the configured name for the schema
        #[arg(short, long)]
        index: Option<String>,
    },

    /// Search the collection
    Search {
        #[arg(value_name = "TEXT")]
        text: String,

        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[arg(short, long)]
        year: Option<String>,

        #[arg(short, long, value_enum, default_value = "regular")]
        mode: SearchMode,
    },

    /// Matching documents per year
    Histogram {
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Index {
            file,
            schema,
            index,
        } => run_index(file, schema, index).await?,

        Commands::Search {
            text,
            skip,
            limit,
            year,
            mode,
        } => {
            let mut query = vec![
                ("search_query", text),
                ("skip", skip.to_string()),
                ("limit", limit.to_string()),
            ];
            if let Some(year) = year {
                query.push(("year", year));
            }

            let response = client
                .get(format!("{}/api/v1/{}", cli.endpoint, mode.path()))
                .query(&query)
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Histogram { text } => {
            let response = client
                .get(format!("{}/api/v1/get_docs_per_year_count", cli.endpoint))
                .query(&[("search_query", text)])
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

async fn run_index(
    file: Option<PathBuf>,
    kind: SchemaKind,
    index: Option<String>,
) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config.observability)?;

    let file = file.unwrap_or_else(|| config.loader.data_path.clone());
    let documents = load_documents(&file)?;
    let index = index.unwrap_or_else(|| config.indices.for_kind(kind).to_string());

    let embedder = loader_embedder(kind, &config.embedding)?;
    let dims = embedder
        .as_ref()
        .map_or(config.embedding.dimension, |embedder| embedder.dimension());
    let schema = IndexSchema::for_kind(kind, dims);

    let connections = ConnectionManager::new(create_connector(&config.store)?);
    let store = connections
        .connect(&ConnectionPolicy::from(&config.connection))
        .await?;

    let summary = index_corpus(
        store,
        &index,
        &schema,
        &documents,
        embedder.as_deref(),
        RetryPolicy::from(&config.loader),
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if !summary.failures.is_empty() {
        anyhow::bail!(
            "{} of {} documents were rejected by the store",
            summary.failures.len(),
            summary.count
        );
    }
    Ok(())
}

/// Only dense-vector indices embed documents while loading
fn loader_embedder(
    kind: SchemaKind,
    config: &EmbeddingConfig,
) -> anyhow::Result<Option<Arc<dyn Embedder>>> {
    if kind != SchemaKind::DenseVector {
        return Ok(None);
    }
    Ok(Some(create_embedder(config)?))
}
