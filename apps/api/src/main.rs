use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use chatbot_cell::ChatAssistant;
use medical_records_cell::FileStorage;
use payment_cell::{PaymentGateway, SimulatedGateway};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_database::{SupabaseDirectory, SupabaseRepository};
use shared_utils::AppState;

use crate::router::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic API server");

    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("JWT secret is not set; every authenticated request will be rejected");
    }

    if !config.is_database_configured() {
        anyhow::bail!("SUPABASE_URL and SUPABASE_ANON_PUBLIC_KEY must be set");
    }
    if config.supabase_service_key.is_empty() {
        warn!("SUPABASE_SERVICE_ROLE_KEY is not set; table writes run with the anon key");
    }

    let client = SupabaseClient::new(&config).context("failed to build Supabase client")?;
    info!("Using Supabase database at {}", config.supabase_url);
    let repository = Arc::new(SupabaseRepository::new(client.clone()));
    let directory = Arc::new(SupabaseDirectory::new(client));

    let simulated = SimulatedGateway::new(config.payment_success_rate);
    info!(
        "Simulated payment gateway approves {:.0}% of charges",
        simulated.success_rate() * 100.0
    );
    let gateway: Arc<dyn PaymentGateway> = Arc::new(simulated);
    let assistant = Arc::new(ChatAssistant::from_config(&config)?);
    let storage = Arc::new(FileStorage::new(config.upload_dir.clone()));

    let services = Services {
        app: AppState::new(config.clone(), repository, directory),
        gateway,
        assistant,
        storage,
    };

    // Build the application router
    let app = router::create_router(services)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&config));

    // Run the server
    let addr: SocketAddr = config
        .server_addr
        .parse()
        .with_context(|| format!("invalid SERVER_ADDR '{}'", config.server_addr))?;
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}
