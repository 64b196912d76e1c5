use crate::models::{Bar, CompanyProfile, MarketIndex, NewsArticle, Quote, QuoteDetail};
use crate::quotes::mock::MockQuoteSource;
use crate::quotes::source::{QuoteError, QuoteSource};
use async_trait::async_trait;

/// Wraps the live provider and substitutes synthetic data whenever it is
/// unavailable, so provider outages never reach the caller as hard
/// failures. Unknown symbols still propagate.
pub struct FallbackSource {
    live: Box<dyn QuoteSource>,
    mock: MockQuoteSource,
}

impl FallbackSource {
    pub fn new(live: Box<dyn QuoteSource>) -> Self {
        FallbackSource {
            live,
            mock: MockQuoteSource::new(),
        }
    }
}

#[async_trait]
impl QuoteSource for FallbackSource {
    async fn latest_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        match self.live.latest_quote(symbol).await {
            Err(e) if e.is_unavailable() => {
                tracing::warn!("provider unavailable for {}, using mock quote: {}", symbol, e);
                self.mock.latest_quote(symbol).await
            }
            other => other,
        }
    }

    async fn quote_detail(&self, symbol: &str) -> Result<QuoteDetail, QuoteError> {
        match self.live.quote_detail(symbol).await {
            Err(e) if e.is_unavailable() => {
                tracing::warn!("provider unavailable for {}, using mock quote: {}", symbol, e);
                self.mock.quote_detail(symbol).await
            }
            other => other,
        }
    }

    async fn daily_history(&self, symbol: &str, days: usize) -> Result<Vec<Bar>, QuoteError> {
        match self.live.daily_history(symbol, days).await {
            Err(e) if e.is_unavailable() => {
                tracing::warn!(
                    "provider unavailable for {} history, using mock series: {}",
                    symbol,
                    e
                );
                self.mock.daily_history(symbol, days).await
            }
            other => other,
        }
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, QuoteError> {
        match self.live.company_profile(symbol).await {
            Err(e) if e.is_unavailable() => {
                tracing::warn!(
                    "provider unavailable for {} profile, using mock profile: {}",
                    symbol,
                    e
                );
                self.mock.company_profile(symbol).await
            }
            other => other,
        }
    }

    async fn market_news(&self) -> Result<Vec<NewsArticle>, QuoteError> {
        match self.live.market_news().await {
            Err(e) if e.is_unavailable() => {
                tracing::warn!("news provider unavailable, using mock headlines: {}", e);
                self.mock.market_news().await
            }
            other => other,
        }
    }

    async fn market_indices(&self) -> Result<Vec<MarketIndex>, QuoteError> {
        match self.live.market_indices().await {
            Err(e) if e.is_unavailable() => {
                tracing::warn!("index provider unavailable, using mock indices: {}", e);
                self.mock.market_indices().await
            }
            other => other,
        }
    }
}
