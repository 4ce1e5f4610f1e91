use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::{
    engine,
    error::AppError,
    middleware::auth::AuthUser,
    models::{DepositRequest, Holding, OrderSide, PlaceOrderRequest, Trade},
    state::AppState,
};

pub async fn get_portfolio(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let holdings: Vec<Holding> = sqlx::query_as(
        "SELECT id, user_id, symbol, shares FROM portfolio WHERE user_id = $1 ORDER BY symbol",
    )
    .bind(auth.0)
    .fetch_all(&state.pool)
    .await?;

    let mut items = Vec::with_capacity(holdings.len());
    let mut holdings_total = Decimal::ZERO;

    for holding in &holdings {
        let quote = state
            .quotes
            .lookup(&holding.symbol)
            .await?
            .ok_or(AppError::UnknownSymbol)?;
        let value = quote.price * Decimal::from(holding.shares);
        holdings_total += value;

        items.push(serde_json::json!({
            "symbol": holding.symbol,
            "name": quote.name,
            "shares": holding.shares,
            "current_price": quote.price,
            "value": value
        }));
    }

    let balance: Decimal = sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
        .bind(auth.0)
        .fetch_optional(&state.pool)
        .await?
        .unwrap_or(Decimal::ZERO);

    Ok(Json(serde_json::json!({
        "balance": balance,
        "holdings": items,
        "grand_total": balance + holdings_total
    })))
}

pub async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Trade>>, AppError> {
    let trades: Vec<Trade> = sqlx::query_as(
        "SELECT id, user_id, symbol, side, shares, price, amount, created_at
         FROM trades WHERE user_id = $1 ORDER BY created_at DESC LIMIT 50",
    )
    .bind(auth.0)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(trades))
}

pub async fn get_quote(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(symbol): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if symbol.trim().is_empty() {
        return Err(AppError::InvalidInput("missing symbol".into()));
    }

    let quote = state
        .quotes
        .lookup(&symbol)
        .await?
        .ok_or(AppError::UnknownSymbol)?;

    Ok(Json(serde_json::json!({
        "symbol": quote.symbol,
        "name": quote.name,
        "price": quote.price
    })))
}

pub async fn place_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let side = OrderSide::parse(&req.side)
        .ok_or_else(|| AppError::InvalidInput("side must be BUY or SELL".into()))?;

    if req.symbol.trim().is_empty() {
        return Err(AppError::InvalidInput("missing symbol".into()));
    }
    if req.shares <= 0 {
        return Err(AppError::InvalidInput(
            "shares must be a positive integer".into(),
        ));
    }

    let quote = state
        .quotes
        .lookup(&req.symbol)
        .await?
        .ok_or(AppError::UnknownSymbol)?;

    let executed = engine::execute_order(&state.pool, auth.0, side, &quote, req.shares).await?;

    info!(
        "executed {} {} x{} for {} at {}",
        executed.plan.side.as_str(),
        quote.symbol,
        executed.plan.shares,
        auth.0,
        executed.plan.price
    );

    Ok(Json(serde_json::json!({
        "order_id": executed.order_id,
        "symbol": quote.symbol,
        "side": executed.plan.side,
        "shares": executed.plan.shares,
        "price": executed.plan.price,
        "amount": executed.plan.amount,
        "balance": executed.plan.new_balance
    })))
}

pub async fn deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<DepositRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let balance = engine::execute_deposit(&state.pool, auth.0, req.amount).await?;

    Ok(Json(serde_json::json!({ "balance": balance })))
}
