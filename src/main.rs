use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Method;
use tower_http::cors::CorsLayer;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

use stockpulse_backend::broadcast::{Broadcaster, PriceBook, SnapshotRefresher};
use stockpulse_backend::handlers::{market, portfolio, stocks, ws};
use stockpulse_backend::portfolio::Ledger;
use stockpulse_backend::quotes::source_from_env;
use stockpulse_backend::registry::SubscriptionRegistry;
use stockpulse_backend::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set the log level based on the first argument
    let args: Vec<String> = std::env::args().collect();
    let mut log_level = Level::INFO;
    if args.len() >= 2 {
        log_level = match args[1].as_str() {
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
    }

    // Initalize dotenv so we can read .env file
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_max_level(log_level)
        .init();

    tracing::info!("Log level set to: {}", log_level);

    let frontend_url =
        dotenv::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

    // Initialize CORS layer
    let cors = CorsLayer::new()
        .allow_origin(frontend_url.parse::<HeaderValue>()?)
        .allow_methods(vec![Method::GET, Method::POST])
        .allow_headers(vec![CONTENT_TYPE]);

    // Market data source is chosen once at startup: live providers with a
    // mock fallback, or pure mock when no credentials are configured.
    let source = source_from_env();
    let registry = Arc::new(SubscriptionRegistry::new());
    let book = PriceBook::new();
    let ledger = Ledger::with_demo_positions();

    // Two independent timers: the WebSocket push loop and the faster local
    // snapshot refresh that keeps valuation current.
    let broadcaster = Broadcaster::new(source.clone(), registry.clone(), book.clone()).start();
    let refresher = SnapshotRefresher::new(source.clone(), book.clone()).start();

    let state = AppState {
        source,
        registry,
        book,
        ledger,
    };

    // Build application with routes
    let app = Router::new()
        .route("/", get(|| async { "StockPulse backend is running." }))
        // Stock data routes
        .route("/api/stocks/quote/:symbol", get(stocks::get_quote))
        .route("/api/stocks/history/:symbol", get(stocks::get_history))
        .route("/api/stocks/company/:symbol", get(stocks::get_company))
        // Market-wide routes
        .route("/api/news", get(market::get_news))
        .route("/api/market/indices", get(market::get_indices))
        // Portfolio routes
        .route("/api/portfolio", get(portfolio::get_portfolio))
        .route("/api/portfolio/buy", post(portfolio::buy_stock))
        .route("/api/portfolio/sell", post(portfolio::sell_stock))
        // Real-time channel
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        // CORS and tracing layers
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        );

    // Run server
    let port = dotenv::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    tracing::info!("Listening on: {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the tick loops before exiting so in-flight fetches wind down.
    broadcaster.stop().await;
    refresher.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
