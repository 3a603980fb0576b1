mod envelope;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use envelope::Envelope;
use photo_search_core::{
    DatabaseType, ElasticsearchClient, GatewayConfig, GatewayResponse, HealthMonitor,
    ImageUrlChecker, ResultTransformer, SearchEngine, SearchError, SearchFilters, SearchRequest,
    SearchService, SortField, SortOrder, TransformOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "photo-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file
    #[arg(long, env = "PHOTO_SEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Elasticsearch node URL
    #[arg(long, env = "PHOTO_SEARCH_ENGINE_URL")]
    engine_url: Option<String>,

    /// Index holding the picture documents
    #[arg(long)]
    index: Option<String>,

    /// API key, either pre-encoded or `id:key`
    #[arg(long, env = "PHOTO_SEARCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Basic auth user, ignored when an API key is set
    #[arg(long, env = "PHOTO_SEARCH_USERNAME")]
    username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "PHOTO_SEARCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip TLS certificate validation
    #[arg(long, default_value_t = false)]
    insecure: bool,

    /// Base URL image links are built from
    #[arg(long)]
    image_base_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Search the archive.
    Search {
        /// Free-text query; omit to list the filtered collection.
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Page size, defaults to the configured pagination limit.
        #[arg(long)]
        limit: Option<usize>,
        /// relevance, date, id, width or height
        #[arg(long, default_value = "relevance")]
        sort: SortField,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: SortOrder,
        #[arg(long)]
        photographer: Option<String>,
        /// Earliest date, YYYY-MM-DD
        #[arg(long)]
        date_from: Option<NaiveDate>,
        /// Latest date, YYYY-MM-DD
        #[arg(long)]
        date_to: Option<NaiveDate>,
        #[arg(long)]
        min_width: Option<u32>,
        #[arg(long)]
        max_width: Option<u32>,
        #[arg(long)]
        min_height: Option<u32>,
        #[arg(long)]
        max_height: Option<u32>,
        /// st or sp
        #[arg(long)]
        database: Option<DatabaseType>,
        /// Comma-separated picture ids
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
        #[arg(long, default_value_t = false)]
        highlight: bool,
        /// HEAD-check the image URL of every result.
        #[arg(long, default_value_t = false)]
        check_urls: bool,
    },
    /// Fetch a single picture by id.
    Get {
        #[arg(long)]
        id: String,
    },
    /// List sortable and filterable fields.
    Fields,
    /// Ping the cluster once.
    Health,
    /// Keep pinging the cluster until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let engine = Arc::new(ElasticsearchClient::from_config(&config.engine)?);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        index = engine.index_name(),
        "photo-search boot"
    );
    if let Err(error) = engine.handshake().await {
        warn!(%error, "engine handshake failed, continuing");
    }

    let service = SearchService::new(
        Arc::clone(&engine),
        ResultTransformer::new(TransformOptions::from_config(&config)),
    );

    let outcome = match cli.command {
        Command::Search {
            query,
            offset,
            limit,
            sort,
            order,
            photographer,
            date_from,
            date_to,
            min_width,
            max_width,
            min_height,
            max_height,
            database,
            ids,
            highlight,
            check_urls,
        } => {
            let request = SearchRequest {
                query,
                offset,
                limit: limit.unwrap_or(config.pagination.default_limit),
                sort_by: sort,
                sort_order: order,
                filters: SearchFilters {
                    photographer,
                    date_from,
                    date_to,
                    min_width,
                    max_width,
                    min_height,
                    max_height,
                    database,
                    ids,
                },
                highlight,
            };
            match run_search(&service, &request, config.pagination.max_limit).await {
                Ok(response) => {
                    if check_urls {
                        report_unreachable_images(&response, &config).await?;
                    }
                    Ok(Some(response))
                }
                Err(error) => Err(error),
            }
        }
        Command::Get { id } => match service.get_by_id(&id).await {
            Ok(Some(item)) => Ok(Some(GatewayResponse::Item(item))),
            Ok(None) => {
                emit(&envelope::not_found(&id))?;
                std::process::exit(envelope::exit_code(404));
            }
            Err(error) => Err(error),
        },
        Command::Fields => Ok(Some(GatewayResponse::Fields(service.available_fields()))),
        Command::Health => match engine.ping().await {
            Ok(health) => {
                println!("{}", serde_json::to_string_pretty(&health)?);
                Ok(None)
            }
            Err(error) => Err(error),
        },
        Command::Watch => {
            let monitor = HealthMonitor::spawn(
                Arc::clone(&engine),
                config.engine.health_check_interval(),
            );
            tokio::signal::ctrl_c().await?;
            info!(healthy = monitor.is_healthy(), "shutting down health monitor");
            monitor.shutdown().await;
            Ok(None)
        }
    };

    match outcome {
        Ok(Some(response)) => emit(&envelope::wrap(response)?),
        Ok(None) => Ok(()),
        Err(error) => {
            emit(&envelope::failure(&error))?;
            std::process::exit(envelope::exit_code(error.status_code()));
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };

    if let Some(url) = &cli.engine_url {
        config.engine.node = url.clone();
    }
    if let Some(index) = &cli.index {
        config.engine.index = index.clone();
    }
    if cli.api_key.is_some() {
        config.engine.api_key = cli.api_key.clone();
    }
    if cli.username.is_some() {
        config.engine.username = cli.username.clone();
        config.engine.password = cli.password.clone();
    }
    if cli.insecure {
        config.engine.verify_certificates = false;
    }
    if let Some(base_url) = &cli.image_base_url {
        config.images.base_url = base_url.clone();
    }
    Ok(config)
}

async fn run_search<E>(
    service: &SearchService<E>,
    request: &SearchRequest,
    max_limit: usize,
) -> Result<GatewayResponse, SearchError>
where
    E: SearchEngine + Send + Sync,
{
    request.validate()?;
    if request.limit > max_limit {
        return Err(SearchError::Validation(format!(
            "limit {} exceeds configured maximum {max_limit}",
            request.limit
        )));
    }
    Ok(GatewayResponse::Search(service.search(request).await?))
}

async fn report_unreachable_images(
    response: &GatewayResponse,
    config: &GatewayConfig,
) -> anyhow::Result<()> {
    let GatewayResponse::Search(search) = response else {
        return Ok(());
    };
    let urls = search
        .results
        .iter()
        .map(|item| item.image_url.clone())
        .collect::<Vec<_>>();
    let checker = ImageUrlChecker::new(config.engine.request_timeout())?;
    for check in checker.check_all(&urls).await {
        if !check.reachable {
            warn!(url = %check.url, status = ?check.status, "image not reachable");
        }
    }
    Ok(())
}

fn emit(envelope: &Envelope) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}
