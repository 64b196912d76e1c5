use crate::models::{Bar, CompanyProfile, MarketIndex, NewsArticle, Quote, QuoteDetail};
use crate::quotes::source::{QuoteError, QuoteSource};
use async_trait::async_trait;
use chrono::{Days, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;

/// Uniform band for single-shot quotes: one draw around the static base
/// price, so successive quotes are independent of each other.
const QUOTE_BAND: f64 = 0.05;

/// Per-day band for historical series. Each day's delta applies to the
/// previous day's close, not the base price.
const DAILY_VOLATILITY: f64 = 0.03;

lazy_static::lazy_static! {
    static ref BASE_PRICES: HashMap<&'static str, f64> = HashMap::from([
        ("AAPL", 175.50),
        ("GOOGL", 2750.80),
        ("MSFT", 415.25),
        ("AMZN", 3200.15),
        ("TSLA", 850.75),
        ("NVDA", 485.60),
        ("META", 325.40),
        ("NFLX", 450.85),
    ]);
}

/// Synthetic market data used when no provider credentials are configured.
/// Never fails for symbols in the base table.
pub struct MockQuoteSource;

impl MockQuoteSource {
    pub fn new() -> Self {
        MockQuoteSource
    }

    fn base_price(symbol: &str) -> Result<f64, QuoteError> {
        BASE_PRICES
            .get(symbol.to_uppercase().as_str())
            .copied()
            .ok_or_else(|| QuoteError::UnknownSymbol(symbol.to_string()))
    }
}

impl Default for MockQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Apply multiplicative deltas in sequence, returning one price per delta.
/// Day k's output feeds day k+1, so a change to any delta propagates to
/// every later day and to none of the earlier ones.
fn walk(base: f64, deltas: &[f64]) -> Vec<f64> {
    let mut price = base;
    deltas
        .iter()
        .map(|d| {
            price *= 1.0 + d;
            price
        })
        .collect()
}

fn synthesize_quote(symbol: &str, base: f64) -> Quote {
    let mut rng = rand::rng();
    let delta: f64 = rng.random_range(-QUOTE_BAND..QUOTE_BAND);
    let price = round2(base * (1.0 + delta));
    Quote {
        symbol: symbol.to_uppercase(),
        price,
        change: round2(price - base),
        change_percent: round2((price - base) / base * 100.0),
        volume: rng.random_range(1_000_000..11_000_000),
        timestamp: Utc::now(),
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn latest_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let base = Self::base_price(symbol)?;
        Ok(synthesize_quote(symbol, base))
    }

    async fn quote_detail(&self, symbol: &str) -> Result<QuoteDetail, QuoteError> {
        let quote = self.latest_quote(symbol).await?;
        let price = quote.price;
        let change = quote.change;
        Ok(QuoteDetail {
            quote,
            high: round2(price + 5.0),
            low: round2(price - 5.0),
            open: round2(price - change),
        })
    }

    async fn daily_history(&self, symbol: &str, days: usize) -> Result<Vec<Bar>, QuoteError> {
        let base = Self::base_price(symbol)?;
        let mut rng = rand::rng();

        let deltas: Vec<f64> = (0..=days)
            .map(|_| rng.random_range(-DAILY_VOLATILITY..DAILY_VOLATILITY))
            .collect();
        let closes = walk(base, &deltas);

        let today = Utc::now().date_naive();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let age = (days - i) as u64;
                let open = close * (1.0 + rng.random_range(-0.01..0.01));
                let high = close * (1.0 + rng.random_range(0.0..DAILY_VOLATILITY));
                let low = close * (1.0 - rng.random_range(0.0..DAILY_VOLATILITY));
                Bar {
                    date: today - Days::new(age),
                    open: round2(open),
                    high: round2(high.max(open).max(close)),
                    low: round2(low.min(open).min(close)),
                    close: round2(close),
                    volume: rng.random_range(500_000..5_500_000),
                }
            })
            .collect();
        Ok(bars)
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, QuoteError> {
        Self::base_price(symbol)?;
        let upper = symbol.to_uppercase();
        Ok(CompanyProfile {
            symbol: upper.clone(),
            name: format!("{} Corporation", upper),
            description: "A leading technology company specializing in innovative solutions."
                .to_string(),
            sector: "Technology".to_string(),
            industry: "Software".to_string(),
            market_cap: "5000000000".to_string(),
            pe_ratio: "25.5".to_string(),
            dividend_yield: "1.2".to_string(),
            eps: "6.85".to_string(),
        })
    }

    async fn market_news(&self) -> Result<Vec<NewsArticle>, QuoteError> {
        let now = Utc::now();
        Ok(vec![
            NewsArticle {
                id: 1,
                title: "Federal Reserve Announces Interest Rate Decision".to_string(),
                summary: "The Federal Reserve has announced its latest interest rate decision, \
                          maintaining current rates while signaling potential future adjustments."
                    .to_string(),
                timestamp: now,
                sentiment: "neutral".to_string(),
                url: "#".to_string(),
                source: "Financial Times".to_string(),
            },
            NewsArticle {
                id: 2,
                title: "Tech Stocks Rally on Strong Earnings Reports".to_string(),
                summary: "Major technology companies reported stronger-than-expected earnings, \
                          driving a broad market rally."
                    .to_string(),
                timestamp: now - Duration::hours(1),
                sentiment: "positive".to_string(),
                url: "#".to_string(),
                source: "Reuters".to_string(),
            },
            NewsArticle {
                id: 3,
                title: "Oil Prices Fluctuate Amid Supply Concerns".to_string(),
                summary: "Oil prices experienced volatility as traders weighed supply \
                          constraints against demand concerns."
                    .to_string(),
                timestamp: now - Duration::hours(2),
                sentiment: "negative".to_string(),
                url: "#".to_string(),
                source: "Bloomberg".to_string(),
            },
        ])
    }

    async fn market_indices(&self) -> Result<Vec<MarketIndex>, QuoteError> {
        let row = |index: &str, value: &str, change: &str, pct: &str, trend: &str| MarketIndex {
            index: index.to_string(),
            value: value.to_string(),
            change: change.to_string(),
            change_percent: pct.to_string(),
            trend: trend.to_string(),
        };
        Ok(vec![
            row("S&P 500", "4,567.89", "+23.45", "+0.52%", "up"),
            row("NASDAQ", "14,234.56", "-45.67", "-0.32%", "down"),
            row("DOW JONES", "35,123.78", "+78.90", "+0.23%", "up"),
            row("RUSSELL 2000", "2,156.43", "+12.34", "+0.58%", "up"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quote_stays_within_band_of_base_price() {
        let source = MockQuoteSource::new();
        for _ in 0..50 {
            let q = source.latest_quote("AAPL").await.unwrap();
            assert!(q.price >= 175.50 * (1.0 - QUOTE_BAND) - 0.01);
            assert!(q.price <= 175.50 * (1.0 + QUOTE_BAND) + 0.01);
            assert!(q.volume >= 1_000_000);
        }
    }

    #[tokio::test]
    async fn change_fields_are_consistent_with_base_reference() {
        let source = MockQuoteSource::new();
        let q = source.latest_quote("MSFT").await.unwrap();
        let base = 415.25;
        assert!((q.change - (q.price - base)).abs() < 0.02);
        assert!((q.change_percent - (q.price - base) / base * 100.0).abs() < 0.02);
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected() {
        let source = MockQuoteSource::new();
        match source.latest_quote("ZZZZ").await {
            Err(QuoteError::UnknownSymbol(s)) => assert_eq!(s, "ZZZZ"),
            other => panic!("expected UnknownSymbol, got {:?}", other.map(|q| q.symbol)),
        }
    }

    #[tokio::test]
    async fn lowercase_symbols_resolve() {
        let source = MockQuoteSource::new();
        let q = source.latest_quote("tsla").await.unwrap();
        assert_eq!(q.symbol, "TSLA");
    }

    #[tokio::test]
    async fn history_has_one_point_per_day_plus_today() {
        let source = MockQuoteSource::new();
        let bars = source.daily_history("NFLX", 30).await.unwrap();
        assert_eq!(bars.len(), 31);
        for pair in bars.windows(2) {
            assert!(pair[0].date < pair[1].date, "bars must be oldest first");
        }
        assert_eq!(bars.last().unwrap().date, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn history_bars_have_coherent_ohlc() {
        let source = MockQuoteSource::new();
        let bars = source.daily_history("META", 20).await.unwrap();
        for bar in bars {
            assert!(bar.high >= bar.open && bar.high >= bar.close);
            assert!(bar.low <= bar.open && bar.low <= bar.close);
            assert!(bar.low > 0.0);
        }
    }

    #[test]
    fn walk_is_path_dependent() {
        let deltas = vec![0.01, -0.02, 0.03, 0.01, -0.01];
        let baseline = walk(100.0, &deltas);

        let mut perturbed = deltas.clone();
        perturbed[2] = 0.02;
        let other = walk(100.0, &perturbed);

        // Days before the perturbed draw are untouched, every later day moves.
        assert_eq!(baseline[0], other[0]);
        assert_eq!(baseline[1], other[1]);
        for i in 2..baseline.len() {
            assert_ne!(baseline[i], other[i]);
        }
    }

    #[test]
    fn walk_compounds_rather_than_resampling_base() {
        let prices = walk(100.0, &[0.10, 0.10]);
        assert!((prices[1] - 121.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn detail_open_reverses_the_change() {
        let source = MockQuoteSource::new();
        let d = source.quote_detail("GOOGL").await.unwrap();
        assert!((d.open - (d.quote.price - d.quote.change)).abs() < 0.02);
        assert!(d.high > d.quote.price && d.low < d.quote.price);
    }
}
