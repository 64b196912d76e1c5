use crate::quotes::alpha_vantage::AlphaVantageSource;
use crate::quotes::fallback::FallbackSource;
use crate::quotes::mock::MockQuoteSource;
use crate::quotes::source::QuoteSource;
use std::sync::Arc;

/// Select the market-data source once, at startup. Either provider key left
/// at its "demo" default puts the whole server in mock mode.
pub fn source_from_env() -> Arc<dyn QuoteSource> {
    let alpha_vantage_key =
        dotenv::var("ALPHA_VANTAGE_API_KEY").unwrap_or_else(|_| "demo".to_string());
    let finnhub_key = dotenv::var("FINNHUB_API_KEY").unwrap_or_else(|_| "demo".to_string());

    if alpha_vantage_key == "demo" || finnhub_key == "demo" {
        tracing::info!("no provider credentials configured, serving synthetic market data");
        Arc::new(MockQuoteSource::new())
    } else {
        tracing::info!("market data from Alpha Vantage / Finnhub with mock fallback");
        Arc::new(FallbackSource::new(Box::new(AlphaVantageSource::new(
            alpha_vantage_key,
            finnhub_key,
        ))))
    }
}
