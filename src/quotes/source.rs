use crate::models::{Bar, CompanyProfile, MarketIndex, NewsArticle, Quote, QuoteDetail};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl QuoteError {
    /// Everything except an unknown symbol counts as the provider being
    /// unavailable for that call and is recoverable by substitution.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, QuoteError::UnknownSymbol(_))
    }
}

/// A market-data source. One implementation talks to the remote providers,
/// the other synthesizes data from a fixed base-price table; which one a
/// deployment gets is decided once, at construction.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Latest quote for a symbol. Callers must tolerate per-symbol failure.
    async fn latest_quote(&self, symbol: &str) -> Result<Quote, QuoteError>;

    /// Latest quote plus intraday high/low/open.
    async fn quote_detail(&self, symbol: &str) -> Result<QuoteDetail, QuoteError>;

    /// Daily OHLCV series covering the last `days` days, oldest first.
    async fn daily_history(&self, symbol: &str, days: usize) -> Result<Vec<Bar>, QuoteError>;

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, QuoteError>;

    async fn market_news(&self) -> Result<Vec<NewsArticle>, QuoteError>;

    async fn market_indices(&self) -> Result<Vec<MarketIndex>, QuoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_symbol_is_not_unavailable() {
        assert!(!QuoteError::UnknownSymbol("ZZZZ".into()).is_unavailable());
        assert!(QuoteError::Provider("HTTP 503".into()).is_unavailable());
        assert!(QuoteError::Malformed("missing Global Quote".into()).is_unavailable());
    }
}
