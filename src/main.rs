use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use surgeon_match::config::{DirectoryBackend, Settings};
use surgeon_match::core::MatchEngine;
use surgeon_match::routes::{self, AppState};
use surgeon_match::services::{
    AirtableDirectory, CachedDirectory, DistributionLedger, InMemoryDirectory, InMemoryLedger,
    LeadPipeline, LogNotifier, NotificationDispatcher, OpenAiReranker, PostgresLedger,
    SurgeonDirectory, WebhookNotifier,
};
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error<E: std::fmt::Display>(what: &str, err: E) -> io::Error {
    error!("{}: {}", what, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", what, err))
}

fn init_tracing(level: &str, format: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn build_directory(settings: &Settings) -> io::Result<Arc<dyn SurgeonDirectory>> {
    let directory = &settings.directory;
    let timeout = Duration::from_secs(directory.timeout_secs.unwrap_or(10));

    let inner: Arc<dyn SurgeonDirectory> = match directory.backend {
        DirectoryBackend::Airtable => {
            let client = AirtableDirectory::new(
                directory.endpoint.clone(),
                directory.api_key.clone().unwrap_or_default(),
                directory.base_id.clone().unwrap_or_default(),
                directory.table.clone(),
                timeout,
            )
            .map_err(|e| startup_error("Failed to create Airtable client", e))?
            .with_taxonomy(settings.scoring.to_policy().taxonomy);
            info!("Airtable directory initialized (table: {})", directory.table);
            Arc::new(client)
        }
        DirectoryBackend::File => {
            let path = directory.file_path.clone().unwrap_or_default();
            let file = InMemoryDirectory::from_json_file(&path)
                .map_err(|e| startup_error("Failed to load surgeon file", e))?;
            Arc::new(file)
        }
    };

    let capacity = directory.cache_capacity.unwrap_or(1000);
    let ttl = directory.cache_ttl_secs.unwrap_or(300);
    info!("Directory cache initialized ({} entries, TTL: {}s)", capacity, ttl);

    Ok(Arc::new(CachedDirectory::new(inner, capacity, ttl)))
}

async fn build_ledger(settings: &Settings) -> io::Result<Arc<dyn DistributionLedger>> {
    let database = &settings.database;

    match &database.url {
        Some(url) => {
            let ledger = PostgresLedger::from_settings(
                url,
                database.max_connections,
                database.min_connections,
                database.acquire_timeout_secs,
                database.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;
            info!("PostgreSQL ledger initialized");
            Ok(Arc::new(ledger))
        }
        None => {
            warn!("No database URL configured, lead distributions are kept in memory only");
            Ok(Arc::new(InMemoryLedger::new()))
        }
    }
}

fn build_notifier(settings: &Settings) -> io::Result<Arc<dyn NotificationDispatcher>> {
    let notifications = &settings.notifications;

    match &notifications.webhook_url {
        Some(url) => {
            let timeout = Duration::from_secs(notifications.timeout_secs.unwrap_or(10));
            let notifier = WebhookNotifier::new(url.clone(), timeout)
                .map_err(|e| startup_error("Failed to create webhook notifier", e))?;
            info!("Webhook notifications enabled");
            Ok(Arc::new(notifier))
        }
        None => {
            info!("No webhook configured, notifications are logged only");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing_subscriber::fmt().init();
            return Err(startup_error("Configuration error", e));
        }
    };

    init_tracing(&settings.logging.level, &settings.logging.format);

    info!("Starting surgeon matching service...");

    let directory = build_directory(&settings)?;
    let ledger = build_ledger(&settings).await?;
    let notifier = build_notifier(&settings)?;

    let policy = settings.scoring.to_policy();
    info!("Matcher initialized with weights: {:?}", policy.weights);

    let mut pipeline = LeadPipeline::new(directory, MatchEngine::new(policy), ledger, notifier);

    let reranker_settings = &settings.reranker;
    if reranker_settings.enabled {
        let reranker = OpenAiReranker::new(
            reranker_settings.endpoint.clone(),
            reranker_settings.api_key.clone().unwrap_or_default(),
            reranker_settings.model.clone(),
            Duration::from_secs(reranker_settings.timeout_secs.unwrap_or(30)),
        )
        .map_err(|e| startup_error("Failed to create re-ranker", e))?;
        pipeline = pipeline.with_reranker(Arc::new(reranker), reranker_settings.pool_size);
        info!("Re-ranker enabled (model: {})", reranker_settings.model);
    }

    // Build application state
    let app_state = AppState {
        pipeline: Arc::new(pipeline),
        default_limit: settings.matching.default_limit(),
        max_limit: settings.matching.max_limit(),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
