use crate::models::{Bar, CompanyProfile, MarketIndex, NewsArticle, Quote, QuoteDetail};
use crate::quotes::source::{QuoteError, QuoteSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";
const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Quotes are reused for this long before the provider is asked again.
/// Alpha Vantage free keys are heavily rate limited.
const QUOTE_CACHE_TTL: Duration = Duration::from_secs(300);

const INDEX_SYMBOLS: [(&str, &str); 4] = [
    ("^GSPC", "S&P 500"),
    ("^IXIC", "NASDAQ"),
    ("^DJI", "DOW JONES"),
    ("^RUT", "RUSSELL 2000"),
];

/// Live market data: Alpha Vantage for quotes, history and company
/// overviews, Finnhub for headlines.
pub struct AlphaVantageSource {
    client: reqwest::Client,
    alpha_vantage_key: String,
    finnhub_key: String,
    cache: Mutex<HashMap<String, (QuoteDetail, Instant)>>,
}

impl AlphaVantageSource {
    pub fn new(alpha_vantage_key: String, finnhub_key: String) -> Self {
        AlphaVantageSource {
            client: reqwest::Client::new(),
            alpha_vantage_key,
            finnhub_key,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn query(&self, function: &str, symbol: &str) -> Result<Value, QuoteError> {
        let response = self
            .client
            .get(ALPHA_VANTAGE_BASE_URL)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.alpha_vantage_key.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QuoteError::Provider(format!("HTTP {}", response.status())));
        }
        Ok(response.json().await?)
    }

    async fn fetch_quote_detail(&self, symbol: &str) -> Result<QuoteDetail, QuoteError> {
        let symbol = symbol.to_uppercase();
        let now = Instant::now();

        let mut cache = self.cache.lock().await;
        if let Some((detail, fetched_at)) = cache.get(&symbol) {
            if now.duration_since(*fetched_at) < QUOTE_CACHE_TTL {
                return Ok(detail.clone());
            }
        }

        let body = self.query("GLOBAL_QUOTE", &symbol).await?;
        let detail = parse_global_quote(&symbol, &body)?;
        cache.insert(symbol, (detail.clone(), now));
        Ok(detail)
    }
}

fn field_str<'a>(obj: &'a Value, key: &str) -> Result<&'a str, QuoteError> {
    obj[key]
        .as_str()
        .ok_or_else(|| QuoteError::Malformed(format!("missing field {}", key)))
}

fn field_f64(obj: &Value, key: &str) -> Result<f64, QuoteError> {
    field_str(obj, key)?
        .parse()
        .map_err(|_| QuoteError::Malformed(format!("non-numeric field {}", key)))
}

fn field_u64(obj: &Value, key: &str) -> Result<u64, QuoteError> {
    field_str(obj, key)?
        .parse()
        .map_err(|_| QuoteError::Malformed(format!("non-numeric field {}", key)))
}

fn parse_global_quote(symbol: &str, body: &Value) -> Result<QuoteDetail, QuoteError> {
    let quote = &body["Global Quote"];
    // The API answers unknown symbols with 200 and an empty object.
    if !quote.is_object() || quote.as_object().is_some_and(|o| o.is_empty()) {
        return Err(QuoteError::UnknownSymbol(symbol.to_string()));
    }

    let percent = field_str(quote, "10. change percent")?
        .trim_end_matches('%')
        .parse()
        .map_err(|_| QuoteError::Malformed("non-numeric change percent".into()))?;

    Ok(QuoteDetail {
        quote: Quote {
            symbol: field_str(quote, "01. symbol")?.to_string(),
            price: field_f64(quote, "05. price")?,
            change: field_f64(quote, "09. change")?,
            change_percent: percent,
            volume: field_u64(quote, "06. volume")?,
            timestamp: Utc::now(),
        },
        high: field_f64(quote, "03. high")?,
        low: field_f64(quote, "04. low")?,
        open: field_f64(quote, "02. open")?,
    })
}

fn parse_daily_series(symbol: &str, body: &Value) -> Result<Vec<Bar>, QuoteError> {
    let series = body["Time Series (Daily)"]
        .as_object()
        .ok_or_else(|| QuoteError::UnknownSymbol(symbol.to_string()))?;

    let mut bars = Vec::with_capacity(series.len());
    for (date, values) in series {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| QuoteError::Malformed(format!("bad series date {}", date)))?;
        bars.push(Bar {
            date,
            open: field_f64(values, "1. open")?,
            high: field_f64(values, "2. high")?,
            low: field_f64(values, "3. low")?,
            close: field_f64(values, "4. close")?,
            volume: field_u64(values, "5. volume")?,
        });
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn parse_overview(symbol: &str, body: &Value) -> Result<CompanyProfile, QuoteError> {
    if body["Symbol"].as_str().is_none() {
        return Err(QuoteError::UnknownSymbol(symbol.to_string()));
    }
    let text = |key: &str| body[key].as_str().unwrap_or_default().to_string();
    Ok(CompanyProfile {
        symbol: text("Symbol"),
        name: text("Name"),
        description: text("Description"),
        sector: text("Sector"),
        industry: text("Industry"),
        market_cap: text("MarketCapitalization"),
        pe_ratio: text("PERatio"),
        dividend_yield: text("DividendYield"),
        eps: text("EPS"),
    })
}

fn parse_news(body: &Value) -> Result<Vec<NewsArticle>, QuoteError> {
    let articles = body
        .as_array()
        .ok_or_else(|| QuoteError::Malformed("news response is not an array".into()))?;

    Ok(articles
        .iter()
        .take(20)
        .map(|article| NewsArticle {
            id: article["id"].as_u64().unwrap_or_default(),
            title: article["headline"].as_str().unwrap_or_default().to_string(),
            summary: article["summary"].as_str().unwrap_or_default().to_string(),
            timestamp: article["datetime"]
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now),
            sentiment: article["sentiment"]
                .as_str()
                .unwrap_or("neutral")
                .to_string(),
            url: article["url"].as_str().unwrap_or_default().to_string(),
            source: article["source"].as_str().unwrap_or_default().to_string(),
        })
        .collect())
}

#[async_trait]
impl QuoteSource for AlphaVantageSource {
    async fn latest_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        Ok(self.fetch_quote_detail(symbol).await?.quote)
    }

    async fn quote_detail(&self, symbol: &str) -> Result<QuoteDetail, QuoteError> {
        self.fetch_quote_detail(symbol).await
    }

    async fn daily_history(&self, symbol: &str, _days: usize) -> Result<Vec<Bar>, QuoteError> {
        let symbol = symbol.to_uppercase();
        let body = self.query("TIME_SERIES_DAILY", &symbol).await?;
        parse_daily_series(&symbol, &body)
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, QuoteError> {
        let symbol = symbol.to_uppercase();
        let body = self.query("OVERVIEW", &symbol).await?;
        parse_overview(&symbol, &body)
    }

    async fn market_news(&self) -> Result<Vec<NewsArticle>, QuoteError> {
        let response = self
            .client
            .get(format!("{}/news", FINNHUB_BASE_URL))
            .query(&[("category", "general"), ("token", self.finnhub_key.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QuoteError::Provider(format!("HTTP {}", response.status())));
        }
        parse_news(&response.json().await?)
    }

    async fn market_indices(&self) -> Result<Vec<MarketIndex>, QuoteError> {
        let mut rows = Vec::with_capacity(INDEX_SYMBOLS.len());
        for (symbol, name) in INDEX_SYMBOLS {
            // One slow or failing index must not take down the rest.
            match self.fetch_quote_detail(symbol).await {
                Ok(detail) => rows.push(MarketIndex {
                    index: name.to_string(),
                    value: format!("{:.2}", detail.quote.price),
                    change: format!("{:+.2}", detail.quote.change),
                    change_percent: format!("{:+.2}%", detail.quote.change_percent),
                    trend: if detail.quote.change >= 0.0 {
                        "up".to_string()
                    } else {
                        "down".to_string()
                    },
                }),
                Err(e) => tracing::warn!("skipping index {}: {}", name, e),
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_global_quote() -> Value {
        json!({
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "173.20",
                "03. high": "176.10",
                "04. low": "172.85",
                "05. price": "175.50",
                "06. volume": "45000000",
                "09. change": "2.30",
                "10. change percent": "+1.33%"
            }
        })
    }

    #[test]
    fn global_quote_maps_provider_fields() {
        let detail = parse_global_quote("AAPL", &sample_global_quote()).unwrap();
        assert_eq!(detail.quote.symbol, "AAPL");
        assert_eq!(detail.quote.price, 175.50);
        assert_eq!(detail.quote.change_percent, 1.33);
        assert_eq!(detail.quote.volume, 45_000_000);
        assert_eq!(detail.open, 173.20);
    }

    #[test]
    fn negative_change_percent_parses() {
        let mut body = sample_global_quote();
        body["Global Quote"]["10. change percent"] = json!("-0.55%");
        let detail = parse_global_quote("AAPL", &body).unwrap();
        assert_eq!(detail.quote.change_percent, -0.55);
    }

    #[test]
    fn empty_global_quote_is_unknown_symbol() {
        let body = json!({ "Global Quote": {} });
        assert!(matches!(
            parse_global_quote("ZZZZ", &body),
            Err(QuoteError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn missing_price_is_malformed() {
        let mut body = sample_global_quote();
        body["Global Quote"]
            .as_object_mut()
            .unwrap()
            .remove("05. price");
        assert!(matches!(
            parse_global_quote("AAPL", &body),
            Err(QuoteError::Malformed(_))
        ));
    }

    #[test]
    fn daily_series_sorts_oldest_first() {
        let body = json!({
            "Time Series (Daily)": {
                "2024-01-03": {
                    "1. open": "101.0", "2. high": "103.0", "3. low": "100.0",
                    "4. close": "102.0", "5. volume": "1200000"
                },
                "2024-01-02": {
                    "1. open": "99.0", "2. high": "101.5", "3. low": "98.5",
                    "4. close": "101.0", "5. volume": "900000"
                }
            }
        });
        let bars = parse_daily_series("AAPL", &body).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].date < bars[1].date);
        assert_eq!(bars[0].close, 101.0);
    }

    #[test]
    fn overview_without_symbol_is_unknown() {
        let body = json!({ "Note": "rate limited" });
        assert!(matches!(
            parse_overview("AAPL", &body),
            Err(QuoteError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn news_caps_at_twenty_and_defaults_sentiment() {
        let articles: Vec<Value> = (0..30)
            .map(|i| {
                json!({
                    "id": i,
                    "headline": format!("headline {}", i),
                    "summary": "s",
                    "datetime": 1_700_000_000,
                    "url": "https://example.com",
                    "source": "Reuters"
                })
            })
            .collect();
        let news = parse_news(&json!(articles)).unwrap();
        assert_eq!(news.len(), 20);
        assert_eq!(news[0].sentiment, "neutral");
    }
}
