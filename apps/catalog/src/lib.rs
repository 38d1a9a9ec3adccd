use anyhow::{Context, bail};
use axum::{
    Router,
    http::{HeaderMap, header::HOST},
    response::{IntoResponse, Response},
    routing::get,
};
use catalog_core::{BASE_PATH, MemoryStore, RESOURCE_PATH, SpecStore, SurrealStore, factory};
use std::sync::Arc;
use std::time::Instant;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

// Expose modules for use in main.rs and tests
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod open_telemetry;

use metrics::Metrics;

/// Shared database connection wrapped in Arc for sharing across tasks
pub type SharedDb = Arc<Surreal<Client>>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SpecStore>,
    pub links: LinkBase,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Turn a handler result into a response and record it.
    pub fn observe<T: IntoResponse>(
        &self,
        operation: &'static str,
        start: Instant,
        result: Result<T, error::ApiError>,
    ) -> Response {
        let response = result.into_response();
        self.metrics
            .record_request(operation, response.status().as_u16(), start.elapsed());
        response
    }
}

/// Where `href` links point.
#[derive(Clone, Debug)]
pub struct LinkBase {
    /// Configured public URL; when set it wins over the request's Host header.
    pub public_url: Option<String>,
    /// Used when neither a public URL nor a Host header is available.
    pub fallback_url: String,
}

impl LinkBase {
    pub fn for_request(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.public_url {
            return url.clone();
        }
        headers
            .get(HOST)
            .and_then(|host| host.to_str().ok())
            .filter(|host| !host.is_empty())
            .map(|host| format!("http://{}", host))
            .unwrap_or_else(|| self.fallback_url.clone())
    }

    /// Base for links built outside of a request.
    pub fn default_base(&self) -> &str {
        self.public_url.as_deref().unwrap_or(&self.fallback_url)
    }
}

// --- Configuration ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Surreal,
}

impl StoreBackend {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "surreal" | "surrealdb" => Some(Self::Surreal),
            _ => None,
        }
    }
}

pub struct Config {
    pub listen_addr: String,
    pub links: LinkBase,
    pub backend: StoreBackend,
    pub seed_fixture: bool,
    pub db_addr: String,
    pub db_user: String,
    pub db_pass: String,
    pub db_ns: String,
    pub db_db: String,
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

pub fn load_config() -> anyhow::Result<Config> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listen_addr =
        std::env::var("LISTEN_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{}", port));
    let listen_port = listen_addr
        .rsplit_once(':')
        .map(|(_, p)| p.to_string())
        .unwrap_or(port);

    let raw_backend = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string());
    let Some(backend) = StoreBackend::parse(&raw_backend) else {
        bail!("Unknown STORE_BACKEND {:?}, expected \"memory\" or \"surreal\"", raw_backend);
    };

    Ok(Config {
        links: LinkBase {
            public_url: std::env::var("PUBLIC_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            fallback_url: format!("http://localhost:{}", listen_port),
        },
        listen_addr,
        backend,
        seed_fixture: std::env::var("SEED_FIXTURE")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true),
        db_addr: std::env::var("SURREALDB_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
        db_user: std::env::var("SURREALDB_USER").unwrap_or_else(|_| "root".to_string()),
        db_pass: std::env::var("SURREALDB_PASS").unwrap_or_else(|_| "root".to_string()),
        db_ns: std::env::var("SURREALDB_NS").unwrap_or_else(|_| "test".to_string()),
        db_db: std::env::var("SURREALDB_DB").unwrap_or_else(|_| "test".to_string()),
        otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|e| !e.is_empty()),
        service_name: std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "catalog".to_string()),
    })
}

// --- Database Connection ---

pub async fn connect_database(config: &Config) -> anyhow::Result<SharedDb> {
    info!(addr = %config.db_addr, "Connecting to SurrealDB");

    let db = Surreal::new::<Ws>(&config.db_addr)
        .await
        .context("Failed to connect to SurrealDB")?;

    db.signin(Root {
        username: config.db_user.clone(),
        password: config.db_pass.clone(),
    })
    .await
    .context("Failed to signin")?;

    db.use_ns(&config.db_ns)
        .use_db(&config.db_db)
        .await
        .context("Failed to select namespace/database")?;

    info!("Connected to SurrealDB successfully");
    Ok(Arc::new(db))
}

pub async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn SpecStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Surreal => {
            let db = connect_database(config).await?;
            let store = SurrealStore::new(db);
            store
                .prepare()
                .await
                .context("Failed to prepare catalog table")?;
            Ok(Arc::new(store))
        }
    }
}

// --- Router Setup ---

pub fn create_app(state: AppState) -> Router {
    let collection = format!("{}{}", BASE_PATH, RESOURCE_PATH);
    let item = format!("{}/:id", collection);

    Router::new()
        .route(
            &collection,
            get(handlers::list_handler).post(handlers::create_handler),
        )
        .route(
            &item,
            get(handlers::get_handler)
                .patch(handlers::update_handler)
                .delete(handlers::delete_handler),
        )
        .route("/health", get(handlers::health_handler))
        .route("/version", get(handlers::version_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// --- Server Lifecycle ---

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config()?;

    // Initialize observability
    open_telemetry::init_tracing(config.otlp_endpoint.as_deref(), &config.service_name)
        .context("Failed to initialize tracing")?;
    let (meter_provider, metrics) =
        metrics::init_metrics(config.otlp_endpoint.as_deref(), &config.service_name)
            .context("Failed to initialize metrics")?;
    let metrics = Arc::new(metrics);

    info!(backend = ?config.backend, "Starting catalog service...");

    let store = build_store(&config).await?;

    let existing = store
        .count()
        .await
        .context("Failed to count stored records")?;
    metrics
        .spec_count
        .add(i64::try_from(existing).unwrap_or(i64::MAX), &[]);

    if config.seed_fixture {
        let fixture = factory::fixture(config.links.default_base());
        let seeded = store
            .seed(fixture)
            .await
            .context("Failed to seed fixture record")?;
        if seeded {
            metrics.spec_count.add(1, &[]);
            info!(id = factory::FIXTURE_ID, "Seeded fixture record");
        }
    }

    let state = AppState {
        store,
        links: config.links.clone(),
        metrics,
    };

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .context("Failed to bind port")?;

    info!(
        addr = %config.listen_addr,
        base = %format!("{}{}", config.links.default_base(), BASE_PATH),
        "Listening for requests"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(meter_provider))
        .await
        .context("Server error")?;

    opentelemetry::global::shutdown_tracer_provider();

    Ok(())
}

async fn shutdown_signal(meter_provider: opentelemetry_sdk::metrics::SdkMeterProvider) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");

    if let Err(e) = meter_provider.shutdown() {
        error!(error = %e, "Failed to shutdown meter provider");
    }
}
