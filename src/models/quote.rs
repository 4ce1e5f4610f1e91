use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}
