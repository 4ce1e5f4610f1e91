use sqlx::PgPool;

use crate::config::Config;
use crate::quotes::QuoteClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub quotes: QuoteClient,
}
