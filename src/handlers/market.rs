use crate::handlers::stocks::quote_error_response;
use crate::models::{MarketIndex, NewsArticle};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn get_news(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<NewsArticle>>), (StatusCode, Json<String>)> {
    let news = state
        .source
        .market_news()
        .await
        .map_err(quote_error_response)?;
    Ok((StatusCode::OK, Json(news)))
}

pub async fn get_indices(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<MarketIndex>>), (StatusCode, Json<String>)> {
    let indices = state
        .source
        .market_indices()
        .await
        .map_err(quote_error_response)?;
    Ok((StatusCode::OK, Json(indices)))
}
