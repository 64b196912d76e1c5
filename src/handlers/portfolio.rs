use crate::handlers::stocks::quote_error_response;
use crate::models::{PortfolioValuation, TradeConfirmation, TradeRequest};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

/// The ledger valued against the latest price snapshot. Positions whose
/// symbol has no snapshot price yet are valued at cost basis.
pub async fn get_portfolio(State(state): State<AppState>) -> (StatusCode, Json<PortfolioValuation>) {
    let positions = state.ledger.positions().await;
    let prices = state.book.latest_prices().await;
    (
        StatusCode::OK,
        Json(crate::portfolio::valuate(&positions, &prices)),
    )
}

/// Price a trade executes at: the broadcast snapshot when we have one,
/// otherwise a direct fetch.
async fn execution_price(
    state: &AppState,
    symbol: &str,
) -> Result<f64, (StatusCode, Json<String>)> {
    if let Some(price) = state.book.price(&symbol.to_uppercase()).await {
        return Ok(price);
    }
    state
        .source
        .latest_quote(symbol)
        .await
        .map(|q| q.price)
        .map_err(quote_error_response)
}

/// Buy shares at the current price. The request body carries the stock
/// symbol and the quantity to buy.
#[axum::debug_handler]
pub async fn buy_stock(
    State(state): State<AppState>,
    Json(trade): Json<TradeRequest>,
) -> Result<(StatusCode, Json<TradeConfirmation>), (StatusCode, Json<String>)> {
    let price = execution_price(&state, &trade.symbol).await?;
    let position = state
        .ledger
        .buy(&trade.symbol, trade.shares, price)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e.to_string())))?;

    Ok((
        StatusCode::CREATED,
        Json(TradeConfirmation {
            symbol: position.symbol.clone(),
            shares: trade.shares,
            price,
            position: Some(position),
        }),
    ))
}

/// Sell shares at the current price. The sale clamps to the owned amount;
/// a position sold down to zero disappears from the ledger.
pub async fn sell_stock(
    State(state): State<AppState>,
    Json(trade): Json<TradeRequest>,
) -> Result<(StatusCode, Json<TradeConfirmation>), (StatusCode, Json<String>)> {
    let price = execution_price(&state, &trade.symbol).await?;
    let outcome = state
        .ledger
        .sell(&trade.symbol, trade.shares)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e.to_string())))?;

    Ok((
        StatusCode::CREATED,
        Json(TradeConfirmation {
            symbol: trade.symbol.to_uppercase(),
            shares: outcome.shares_sold,
            price,
            position: outcome.remaining,
        }),
    ))
}
