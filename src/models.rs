use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single point-in-time price observation for a symbol.
/// A new Quote supersedes the prior one for the same symbol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
}

/// Quote plus the intraday fields the REST quote endpoint exposes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetail {
    #[serde(flatten)]
    pub quote: Quote,
    pub high: f64,
    pub low: f64,
    pub open: f64,
}

/// One day of OHLCV history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: String,
    pub description: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: String,
    pub pe_ratio: String,
    pub dividend_yield: String,
    pub eps: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: u64,
    pub title: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment: String,
    pub url: String,
    pub source: String,
}

/// One market-index row (S&P 500, NASDAQ, ...). Values are preformatted
/// display strings, matching the front-end contract.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndex {
    pub index: String,
    pub value: String,
    pub change: String,
    pub change_percent: String,
    pub trend: String,
}

/// A holding in the ledger: share count and weighted-average cost basis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub shares: f64,
    pub avg_price: f64,
}

/// Per-position valuation against the latest price snapshot. Derived,
/// never stored.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    #[serde(flatten)]
    pub position: Position,
    pub current_price: f64,
    pub total_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub positions: Vec<ValuationResult>,
    pub total_value: f64,
    pub total_invested: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_percent: f64,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub symbol: String,
    pub shares: f64,
}

/// Response body for buy/sell. `position` is None when a sell closed the
/// position out.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TradeConfirmation {
    pub symbol: String,
    pub shares: f64,
    pub price: f64,
    pub position: Option<Position>,
}

/// Messages a WebSocket client may send.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Subscribe { symbols: Vec<String> },
}

/// Messages pushed to WebSocket clients.
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    PriceUpdate { data: Vec<PriceUpdate> },
}

/// The per-symbol payload inside a `priceUpdate` event.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
}

impl From<&Quote> for PriceUpdate {
    fn from(q: &Quote) -> Self {
        PriceUpdate {
            symbol: q.symbol.clone(),
            price: q.price,
            change: q.change,
            change_percent: q.change_percent,
            volume: q.volume,
        }
    }
}
