use crate::models::{Bar, CompanyProfile, QuoteDetail};
use crate::quotes::QuoteError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

/// How far back a history request reaches, and the most entries one
/// response may carry.
const HISTORY_DAYS: usize = 100;
const HISTORY_CAP: usize = 100;

pub(crate) fn quote_error_response(e: QuoteError) -> (StatusCode, Json<String>) {
    match e {
        QuoteError::UnknownSymbol(symbol) => (
            StatusCode::NOT_FOUND,
            Json(format!("Stock not found: {}", symbol)),
        ),
        other => {
            tracing::error!("provider failure: {}", other);
            (
                StatusCode::BAD_GATEWAY,
                Json("Failed to fetch stock data".to_string()),
            )
        }
    }
}

/// Latest quote with intraday high/low/open for one symbol.
pub async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<(StatusCode, Json<QuoteDetail>), (StatusCode, Json<String>)> {
    let detail = state
        .source
        .quote_detail(&symbol)
        .await
        .map_err(quote_error_response)?;
    Ok((StatusCode::OK, Json(detail)))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub timeframe: Option<String>,
}

/// Daily OHLCV history, oldest first, at most the latest 100 days.
pub async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<(StatusCode, Json<Vec<Bar>>), (StatusCode, Json<String>)> {
    let timeframe = query.timeframe.as_deref().unwrap_or("daily");
    if timeframe != "daily" {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(format!("Unsupported timeframe: {}", timeframe)),
        ));
    }

    let mut bars = state
        .source
        .daily_history(&symbol, HISTORY_DAYS)
        .await
        .map_err(quote_error_response)?;
    if bars.len() > HISTORY_CAP {
        bars = bars.split_off(bars.len() - HISTORY_CAP);
    }
    Ok((StatusCode::OK, Json(bars)))
}

pub async fn get_company(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<(StatusCode, Json<CompanyProfile>), (StatusCode, Json<String>)> {
    let profile = state
        .source
        .company_profile(&symbol)
        .await
        .map_err(quote_error_response)?;
    Ok((StatusCode::OK, Json(profile)))
}
