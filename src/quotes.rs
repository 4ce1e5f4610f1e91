use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::Quote;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("quote request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("quote provider returned HTTP {0}")]
    Status(StatusCode),

    #[error("quote provider returned a non-positive price for {0}")]
    BadPrice(String),
}

#[derive(Deserialize)]
struct QuoteResponse {
    name: String,
    price: Decimal,
}

/// Client for the external price-lookup provider.
///
/// Symbols are matched case-insensitively; lookups normalize to uppercase
/// before hitting the provider. A symbol the provider does not know is
/// `Ok(None)`, not an error.
#[derive(Clone)]
pub struct QuoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl QuoteClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn lookup(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        let symbol = symbol.trim().to_uppercase();
        let url = format!("{}/quote", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("symbol", symbol.as_str()), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("no quote for {}", symbol);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(QuoteError::Status(response.status()));
        }

        let body: QuoteResponse = response.json().await?;
        if body.price <= Decimal::ZERO {
            return Err(QuoteError::BadPrice(symbol));
        }

        Ok(Some(Quote {
            symbol,
            name: body.name,
            price: body.price,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_provider() -> (MockServer, QuoteClient) {
        let server = MockServer::start().await;
        let client = QuoteClient::new(server.uri(), "test-key");
        (server, client)
    }

    #[tokio::test]
    async fn resolves_a_known_symbol() {
        let (server, client) = mock_provider().await;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("apikey", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "Apple Inc.", "price": 150.0})),
            )
            .mount(&server)
            .await;

        let quote = client.lookup("AAPL").await.unwrap().unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.name, "Apple Inc.");
        assert_eq!(quote.price, dec!(150));
    }

    #[tokio::test]
    async fn normalizes_symbol_to_uppercase() {
        let (server, client) = mock_provider().await;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .and(query_param("symbol", "NFLX"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "Netflix, Inc.", "price": 402.5})),
            )
            .mount(&server)
            .await;

        let quote = client.lookup(" nflx ").await.unwrap().unwrap();
        assert_eq!(quote.symbol, "NFLX");
    }

    #[tokio::test]
    async fn unknown_symbol_is_none() {
        let (server, client) = mock_provider().await;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client.lookup("ZZZZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let (server, client) = mock_provider().await;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        match client.lookup("AAPL").await {
            Err(QuoteError::Status(status)) => assert_eq!(status.as_u16(), 503),
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn garbled_body_is_an_error() {
        let (server, client) = mock_provider().await;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert!(matches!(client.lookup("AAPL").await, Err(QuoteError::Request(_))));
    }

    #[tokio::test]
    async fn non_positive_price_is_rejected() {
        let (server, client) = mock_provider().await;

        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "Bad Co.", "price": 0.0})),
            )
            .mount(&server)
            .await;

        assert!(matches!(client.lookup("BAD").await, Err(QuoteError::BadPrice(_))));
    }
}
