use crate::models::{PortfolioValuation, Position, ValuationResult};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug, PartialEq)]
pub enum LedgerError {
    #[error("share count must be positive")]
    InvalidShares,
    #[error("price must be positive")]
    InvalidPrice,
    #[error("no shares owned of {0}")]
    NoPosition(String),
}

/// Result of a sell. `remaining` is None when the position was closed out.
#[derive(Debug, Clone, PartialEq)]
pub struct SellOutcome {
    pub shares_sold: f64,
    pub remaining: Option<Position>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// The owned-position ledger, keyed by symbol. Positions are only mutated
/// through buy/sell; valuation reads them.
#[derive(Clone, Default)]
pub struct Ledger {
    positions: Arc<RwLock<HashMap<String, Position>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger pre-seeded with the demo holdings the dashboard ships with.
    pub fn with_demo_positions() -> Self {
        let seed = [
            ("AAPL", 50.0, 165.50),
            ("GOOGL", 5.0, 2650.00),
            ("MSFT", 25.0, 400.00),
        ];
        let positions = seed
            .into_iter()
            .map(|(symbol, shares, avg_price)| {
                (
                    symbol.to_string(),
                    Position {
                        symbol: symbol.to_string(),
                        shares,
                        avg_price,
                    },
                )
            })
            .collect();
        Ledger {
            positions: Arc::new(RwLock::new(positions)),
        }
    }

    pub async fn positions(&self) -> Vec<Position> {
        let mut list: Vec<Position> = self.positions.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        list
    }

    /// Buy `shares` at `price`. Folds into the weighted-average cost basis
    /// when a position already exists.
    pub async fn buy(&self, symbol: &str, shares: f64, price: f64) -> Result<Position, LedgerError> {
        if !(shares > 0.0) {
            return Err(LedgerError::InvalidShares);
        }
        if !(price > 0.0) {
            return Err(LedgerError::InvalidPrice);
        }
        let symbol = symbol.to_uppercase();
        let mut positions = self.positions.write().await;
        let position = match positions.get(&symbol) {
            None => Position {
                symbol: symbol.clone(),
                shares,
                avg_price: round2(price),
            },
            Some(existing) => {
                let new_shares = existing.shares + shares;
                let new_avg =
                    (existing.avg_price * existing.shares + price * shares) / new_shares;
                Position {
                    symbol: symbol.clone(),
                    shares: new_shares,
                    avg_price: round2(new_avg),
                }
            }
        };
        positions.insert(symbol, position.clone());
        Ok(position)
    }

    /// Sell up to `shares`. The sale clamps to the owned amount; a position
    /// reaching zero is removed. Average cost is unaffected by sells.
    pub async fn sell(&self, symbol: &str, shares: f64) -> Result<SellOutcome, LedgerError> {
        if !(shares > 0.0) {
            return Err(LedgerError::InvalidShares);
        }
        let symbol = symbol.to_uppercase();
        let mut positions = self.positions.write().await;
        let existing = positions
            .get(&symbol)
            .ok_or_else(|| LedgerError::NoPosition(symbol.clone()))?;

        let shares_sold = shares.min(existing.shares);
        let remaining_shares = existing.shares - shares_sold;
        if remaining_shares <= 0.0 {
            positions.remove(&symbol);
            return Ok(SellOutcome {
                shares_sold,
                remaining: None,
            });
        }
        let position = Position {
            symbol: symbol.clone(),
            shares: remaining_shares,
            avg_price: existing.avg_price,
        };
        positions.insert(symbol, position.clone());
        Ok(SellOutcome {
            shares_sold,
            remaining: Some(position),
        })
    }
}

/// Value the ledger against the latest price snapshot. Pure: no hidden
/// state, same inputs give same outputs. A symbol missing from the
/// snapshot is valued at its cost basis.
pub fn valuate(positions: &[Position], latest_prices: &HashMap<String, f64>) -> PortfolioValuation {
    let mut results = Vec::with_capacity(positions.len());
    let mut total_value = 0.0;
    let mut total_invested = 0.0;

    for position in positions {
        let current_price = latest_prices
            .get(&position.symbol)
            .copied()
            .unwrap_or(position.avg_price);
        let value = current_price * position.shares;
        let invested = position.avg_price * position.shares;
        let gain_loss = value - invested;
        let gain_loss_percent = if invested > 0.0 {
            gain_loss / invested * 100.0
        } else {
            0.0
        };
        total_value += value;
        total_invested += invested;
        results.push(ValuationResult {
            position: position.clone(),
            current_price,
            total_value: value,
            gain_loss,
            gain_loss_percent,
        });
    }

    let total_gain_loss = total_value - total_invested;
    // Aggregate percent comes from aggregate invested, not from averaging
    // the per-position percentages.
    let total_gain_loss_percent = if total_invested > 0.0 {
        total_gain_loss / total_invested * 100.0
    } else {
        0.0
    };

    PortfolioValuation {
        positions: results,
        total_value,
        total_invested,
        total_gain_loss,
        total_gain_loss_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(symbol: &str, shares: f64, avg_price: f64) -> Position {
        Position {
            symbol: symbol.to_string(),
            shares,
            avg_price,
        }
    }

    fn prices(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn valuates_the_worked_example() {
        let result = valuate(
            &[position("AAPL", 50.0, 165.50)],
            &prices(&[("AAPL", 175.50)]),
        );
        let aapl = &result.positions[0];
        assert!((aapl.total_value - 8775.00).abs() < 1e-9);
        assert!((aapl.gain_loss - 500.00).abs() < 1e-9);
        assert!((aapl.gain_loss_percent - 6.0423).abs() < 1e-3);
    }

    #[test]
    fn missing_price_falls_back_to_cost_basis() {
        let result = valuate(&[position("NFLX", 10.0, 450.85)], &HashMap::new());
        let nflx = &result.positions[0];
        assert_eq!(nflx.current_price, 450.85);
        assert_eq!(nflx.gain_loss, 0.0);
        assert_eq!(nflx.gain_loss_percent, 0.0);
    }

    #[test]
    fn valuate_is_idempotent() {
        let positions = [
            position("AAPL", 50.0, 165.50),
            position("GOOGL", 5.0, 2650.00),
        ];
        let snapshot = prices(&[("AAPL", 175.50), ("GOOGL", 2750.80)]);
        assert_eq!(valuate(&positions, &snapshot), valuate(&positions, &snapshot));
    }

    #[test]
    fn aggregate_percent_uses_aggregate_invested() {
        // +10% on a small position, -10% on one ten times larger. Averaging
        // the percentages would give 0; the aggregate must be negative.
        let positions = [position("A", 10.0, 10.0), position("B", 10.0, 100.0)];
        let snapshot = prices(&[("A", 11.0), ("B", 90.0)]);
        let result = valuate(&positions, &snapshot);
        assert!((result.total_gain_loss - (-90.0)).abs() < 1e-9);
        assert!((result.total_gain_loss_percent - (-90.0 / 1100.0 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn zero_invested_does_not_divide() {
        let result = valuate(&[position("FREE", 10.0, 0.0)], &prices(&[("FREE", 5.0)]));
        assert_eq!(result.positions[0].gain_loss_percent, 0.0);
        assert_eq!(result.total_gain_loss_percent, 0.0);
    }

    #[tokio::test]
    async fn buy_creates_then_averages() {
        let ledger = Ledger::new();
        let first = ledger.buy("AAPL", 50.0, 165.50).await.unwrap();
        assert_eq!(first.shares, 50.0);
        assert_eq!(first.avg_price, 165.50);

        // Same share count at a higher price: midpoint average.
        let second = ledger.buy("aapl", 50.0, 175.50).await.unwrap();
        assert_eq!(second.shares, 100.0);
        assert_eq!(second.avg_price, 170.50);
    }

    #[tokio::test]
    async fn buy_then_sell_restores_share_count_and_keeps_basis() {
        let ledger = Ledger::new();
        ledger.buy("MSFT", 25.0, 400.00).await.unwrap();
        ledger.buy("MSFT", 10.0, 415.25).await.unwrap();
        let before = ledger.positions().await[0].clone();

        ledger.buy("MSFT", 5.0, 430.00).await.unwrap();
        let outcome = ledger.sell("MSFT", 5.0).await.unwrap();

        let after = outcome.remaining.unwrap();
        assert_eq!(after.shares, before.shares);
        // Selling never moves the average cost; only the later buy did.
        let bought_avg = (before.avg_price * 35.0 + 430.00 * 5.0) / 40.0;
        assert!((after.avg_price - (bought_avg * 100.0).round() / 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn oversell_clamps_and_removes_the_position() {
        let ledger = Ledger::new();
        ledger.buy("TSLA", 5.0, 850.75).await.unwrap();

        let outcome = ledger.sell("TSLA", 10.0).await.unwrap();
        assert_eq!(outcome.shares_sold, 5.0);
        assert!(outcome.remaining.is_none());
        assert!(ledger.positions().await.is_empty());
    }

    #[tokio::test]
    async fn selling_an_unowned_symbol_fails() {
        let ledger = Ledger::new();
        assert_eq!(
            ledger.sell("NVDA", 1.0).await,
            Err(LedgerError::NoPosition("NVDA".into()))
        );
    }

    #[tokio::test]
    async fn non_positive_trades_are_rejected() {
        let ledger = Ledger::new();
        assert_eq!(
            ledger.buy("AAPL", 0.0, 100.0).await,
            Err(LedgerError::InvalidShares)
        );
        assert_eq!(
            ledger.buy("AAPL", 1.0, -1.0).await,
            Err(LedgerError::InvalidPrice)
        );
        assert_eq!(
            ledger.sell("AAPL", -2.0).await,
            Err(LedgerError::InvalidShares)
        );
    }

    #[tokio::test]
    async fn demo_ledger_matches_dashboard_seed() {
        let ledger = Ledger::with_demo_positions();
        let positions = ledger.positions().await;
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[0], position("AAPL", 50.0, 165.50));
    }
}
