//! Trading engine: order planning and transactional application.
//!
//! Planning is pure arithmetic over a snapshot of the user's wallet and
//! holding. Application re-checks the plan inside a single transaction with
//! the wallet row locked, so the three writes of a trade (history insert,
//! portfolio change, cash change) commit or roll back together.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{OrderSide, Quote};

#[derive(Debug, Clone)]
pub struct TradePlan {
    pub side: OrderSide,
    pub shares: i64,
    pub price: Decimal,
    /// Cost for buys, proceeds for sells.
    pub amount: Decimal,
    pub new_balance: Decimal,
    /// Holding after the trade. Zero means the portfolio row is removed.
    pub new_shares: i64,
}

#[derive(Debug)]
pub struct ExecutedOrder {
    pub order_id: Uuid,
    pub plan: TradePlan,
}

pub fn plan_buy(
    balance: Decimal,
    held_shares: i64,
    order_shares: i64,
    price: Decimal,
) -> Result<TradePlan, AppError> {
    if order_shares <= 0 {
        return Err(AppError::InvalidInput(
            "shares must be a positive integer".into(),
        ));
    }

    let cost = price * Decimal::from(order_shares);
    if cost > balance {
        return Err(AppError::InsufficientFunds);
    }

    Ok(TradePlan {
        side: OrderSide::Buy,
        shares: order_shares,
        price,
        amount: cost,
        new_balance: balance - cost,
        new_shares: held_shares + order_shares,
    })
}

pub fn plan_sell(
    balance: Decimal,
    holding: Option<i64>,
    order_shares: i64,
    price: Decimal,
) -> Result<TradePlan, AppError> {
    if order_shares <= 0 {
        return Err(AppError::InvalidInput(
            "shares must be a positive integer".into(),
        ));
    }

    let held_shares = holding.ok_or(AppError::NoSuchHolding)?;
    if order_shares > held_shares {
        return Err(AppError::InsufficientShares);
    }

    let proceeds = price * Decimal::from(order_shares);

    Ok(TradePlan {
        side: OrderSide::Sell,
        shares: order_shares,
        price,
        amount: proceeds,
        new_balance: balance + proceeds,
        new_shares: held_shares - order_shares,
    })
}

pub fn plan_deposit(amount: Decimal) -> Result<Decimal, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput("amount must be positive".into()));
    }
    Ok(amount)
}

/// Apply a buy or sell order as one transaction.
///
/// The wallet row lock is the per-user serialization point. Both sides take
/// it first, then the portfolio row, so concurrent orders for one user queue
/// in a fixed order instead of deadlocking. The mutations themselves carry
/// the precondition in their WHERE clause; a zero affected-row count aborts
/// the transaction with the business error.
pub async fn execute_order(
    pool: &PgPool,
    user_id: Uuid,
    side: OrderSide,
    quote: &Quote,
    order_shares: i64,
) -> Result<ExecutedOrder, AppError> {
    let mut tx = pool.begin().await?;

    let balance: Decimal =
        sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::Internal("wallet row missing".into()))?;

    let held: Option<i64> = sqlx::query_scalar(
        "SELECT shares FROM portfolio WHERE user_id = $1 AND symbol = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(&quote.symbol)
    .fetch_optional(&mut *tx)
    .await?;

    let plan = match side {
        OrderSide::Buy => plan_buy(balance, held.unwrap_or(0), order_shares, quote.price)?,
        OrderSide::Sell => plan_sell(balance, held, order_shares, quote.price)?,
    };

    match plan.side {
        OrderSide::Buy => {
            let debited = sqlx::query(
                "UPDATE wallets SET balance = balance - $1, updated_at = NOW()
                 WHERE user_id = $2 AND balance >= $1",
            )
            .bind(plan.amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            if debited.rows_affected() == 0 {
                return Err(AppError::InsufficientFunds);
            }

            sqlx::query(
                r#"
                INSERT INTO portfolio (user_id, symbol, shares)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, symbol) DO UPDATE SET shares = portfolio.shares + $3
                "#,
            )
            .bind(user_id)
            .bind(&quote.symbol)
            .bind(plan.shares)
            .execute(&mut *tx)
            .await?;
        }
        OrderSide::Sell => {
            // No zero-share rows persist: selling out removes the row.
            let reduced = if plan.new_shares == 0 {
                sqlx::query(
                    "DELETE FROM portfolio
                     WHERE user_id = $2 AND symbol = $3 AND shares = $1",
                )
            } else {
                sqlx::query(
                    "UPDATE portfolio SET shares = shares - $1
                     WHERE user_id = $2 AND symbol = $3 AND shares > $1",
                )
            }
            .bind(plan.shares)
            .bind(user_id)
            .bind(&quote.symbol)
            .execute(&mut *tx)
            .await?;
            if reduced.rows_affected() == 0 {
                return Err(AppError::InsufficientShares);
            }

            sqlx::query(
                "UPDATE wallets SET balance = balance + $1, updated_at = NOW() WHERE user_id = $2",
            )
            .bind(plan.amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    let order_id: Uuid = sqlx::query_scalar(
        "INSERT INTO trades (user_id, symbol, side, shares, price, amount)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(user_id)
    .bind(&quote.symbol)
    .bind(plan.side.as_str())
    .bind(plan.shares)
    .bind(plan.price)
    .bind(plan.amount)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ExecutedOrder { order_id, plan })
}

/// Credit the user's wallet. Deposits do not appear in the trade history.
pub async fn execute_deposit(
    pool: &PgPool,
    user_id: Uuid,
    amount: Decimal,
) -> Result<Decimal, AppError> {
    let amount = plan_deposit(amount)?;

    let new_balance: Decimal = sqlx::query_scalar(
        "UPDATE wallets SET balance = balance + $1, updated_at = NOW()
         WHERE user_id = $2 RETURNING balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Internal("wallet row missing".into()))?;

    Ok(new_balance)
}
