use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Context, FetchError, FetchErrorKind, Result};
use crate::subscriptions::normalize_symbol;

use super::{DataSource, FetchResult, Quote};

const ALPHA_VANTAGE_ENDPOINT: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage `GLOBAL_QUOTE` client.
pub struct AlphaVantageSource {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<Value>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGlobalQuote {
    #[serde(rename = "02. open")]
    open: String,
    #[serde(rename = "03. high")]
    high: String,
    #[serde(rename = "04. low")]
    low: String,
    #[serde(rename = "05. price")]
    price: String,
    #[serde(rename = "06. volume")]
    volume: String,
    #[serde(rename = "07. latest trading day", default)]
    latest_trading_day: String,
    #[serde(rename = "08. previous close", default)]
    previous_close: String,
    #[serde(rename = "09. change")]
    change: String,
    #[serde(rename = "10. change percent")]
    change_percent: String,
}

impl AlphaVantageSource {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_endpoint(api_key, timeout, ALPHA_VANTAGE_ENDPOINT)
    }

    pub fn with_endpoint(
        api_key: impl Into<String>,
        timeout: Duration,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to construct HTTP client for Alpha Vantage")?;

        Ok(Self::with_client(client, api_key, endpoint))
    }

    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DataSource for AlphaVantageSource {
    async fn fetch(&self, symbol: &str) -> FetchResult<Quote> {
        debug!("Fetching stock: {symbol}");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::new(FetchErrorKind::Transport, symbol, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::new(
                FetchErrorKind::RateLimited,
                symbol,
                "Alpha Vantage answered 429 Too Many Requests",
            ));
        }

        if !status.is_success() {
            return Err(FetchError::new(
                FetchErrorKind::Transport,
                symbol,
                format!("Wrong response from Alpha Vantage: {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::new(FetchErrorKind::Transport, symbol, e.to_string()))?;

        parse_global_quote(symbol, &body)
    }
}

/// Decode a `GLOBAL_QUOTE` payload, classifying the provider's error shapes.
pub fn parse_global_quote(symbol: &str, body: &str) -> FetchResult<Quote> {
    let malformed = |message: String| FetchError::new(FetchErrorKind::MalformedResponse, symbol, message);

    if body.trim().is_empty() {
        return Err(malformed("No data returned from API".to_string()));
    }

    let response: GlobalQuoteResponse = serde_json::from_str(body)
        .map_err(|e| malformed(format!("Failed to parse JSON response: {e}")))?;

    if let Some(message) = response.error_message {
        let kind = if mentions_api_key(&message) {
            FetchErrorKind::InvalidKey
        } else {
            FetchErrorKind::NotFound
        };
        return Err(FetchError::new(kind, symbol, message));
    }

    let raw = match response.global_quote {
        Some(Value::Object(map)) if map.is_empty() => {
            return Err(FetchError::new(
                FetchErrorKind::NotFound,
                symbol,
                "Alpha Vantage returned an empty quote",
            ));
        }
        Some(value) => value,
        None => {
            let notice = response.note.or(response.information);
            return Err(match notice {
                Some(message) if mentions_rate_limit(&message) => {
                    FetchError::new(FetchErrorKind::RateLimited, symbol, message)
                }
                Some(message) if mentions_api_key(&message) => {
                    FetchError::new(FetchErrorKind::InvalidKey, symbol, message)
                }
                Some(message) => malformed(message),
                None => malformed("Stock data didn't have Global Quote value".to_string()),
            });
        }
    };

    let raw: RawGlobalQuote = serde_json::from_value(raw)
        .map_err(|e| malformed(format!("Unexpected Global Quote layout: {e}")))?;

    Ok(Quote {
        symbol: normalize_symbol(symbol),
        open: parse_number(symbol, "open", &raw.open)?,
        high: parse_number(symbol, "high", &raw.high)?,
        low: parse_number(symbol, "low", &raw.low)?,
        price: parse_number(symbol, "price", &raw.price)?,
        volume: parse_volume(symbol, &raw.volume)?,
        latest_trading_day: raw.latest_trading_day,
        previous_close: raw.previous_close,
        change: parse_number(symbol, "change", &raw.change)?,
        change_percent: raw.change_percent,
    })
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("call frequency") || lower.contains("rate limit") || lower.contains("requests per")
}

fn mentions_api_key(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("apikey") || lower.contains("api key")
}

fn parse_number(symbol: &str, field: &str, value: &str) -> FetchResult<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        FetchError::new(
            FetchErrorKind::MalformedResponse,
            symbol,
            format!("Failed to parse {field} value: {value}"),
        )
    })
}

fn parse_volume(symbol: &str, value: &str) -> FetchResult<u64> {
    let trimmed = value.trim();
    trimmed
        .parse::<u64>()
        .or_else(|_| trimmed.parse::<f64>().map(|v| v.max(0.0) as u64))
        .map_err(|_| {
            FetchError::new(
                FetchErrorKind::MalformedResponse,
                symbol,
                format!("Failed to parse volume value: {value}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;

    fn source_for(server: &StubServer) -> AlphaVantageSource {
        AlphaVantageSource::with_client(
            StubServer::client(),
            "secret",
            format!("{}/query", server.base_url),
        )
    }

    const MSFT_PAYLOAD: &str = r#"{
        "Global Quote": {
            "01. symbol": "MSFT",
            "02. open": "410.2000",
            "03. high": "415.8700",
            "04. low": "408.1200",
            "05. price": "414.5800",
            "06. volume": "18231004",
            "07. latest trading day": "2024-05-03",
            "08. previous close": "406.6600",
            "09. change": "7.9200",
            "10. change percent": "1.9476%"
        }
    }"#;

    #[test]
    fn parses_global_quote_payload() {
        let quote = parse_global_quote("msft", MSFT_PAYLOAD).unwrap();

        assert_eq!(quote.symbol, "MSFT");
        assert!((quote.price - 414.58).abs() < 1e-9);
        assert!((quote.change - 7.92).abs() < 1e-9);
        assert_eq!(quote.volume, 18_231_004);
        assert_eq!(quote.latest_trading_day, "2024-05-03");
        assert_eq!(quote.previous_close, "406.6600");
        assert_eq!(quote.change_percent, "1.9476%");
    }

    #[test]
    fn classifies_rate_limit_note() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute and 500 calls per day."}"#;
        let err = parse_global_quote("a", body).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::RateLimited);
        assert_eq!(err.symbol, "a");
    }

    #[test]
    fn classifies_error_messages() {
        let invalid_call = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation for GLOBAL_QUOTE."}"#;
        assert_eq!(
            parse_global_quote("zzzz", invalid_call).unwrap_err().kind,
            FetchErrorKind::NotFound
        );

        let bad_key = r#"{"Error Message": "the parameter apikey is invalid or missing."}"#;
        assert_eq!(
            parse_global_quote("a", bad_key).unwrap_err().kind,
            FetchErrorKind::InvalidKey
        );

        let empty_quote = r#"{"Global Quote": {}}"#;
        assert_eq!(
            parse_global_quote("a", empty_quote).unwrap_err().kind,
            FetchErrorKind::NotFound
        );
    }

    #[test]
    fn rejects_unusable_bodies() {
        for body in ["", "   ", "<html>oops</html>", r#"{"unexpected": true}"#] {
            let err = parse_global_quote("a", body).unwrap_err();
            assert_eq!(err.kind, FetchErrorKind::MalformedResponse, "body: {body}");
        }

        let bad_number = MSFT_PAYLOAD.replace("414.5800", "n/a");
        let err = parse_global_quote("msft", &bad_number).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::MalformedResponse);
        assert!(err.message.contains("price"));
    }

    #[tokio::test]
    async fn fetches_global_quote_over_http() {
        let server = StubServer::start(200, MSFT_PAYLOAD).await;

        let quote = source_for(&server).fetch("MSFT").await.unwrap();

        assert_eq!(quote.symbol, "MSFT");
        assert_eq!(quote.volume, 18_231_004);
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(
            requests[0].starts_with("GET /query?function=GLOBAL_QUOTE&symbol=MSFT&apikey=secret "),
            "unexpected request line: {}",
            requests[0].lines().next().unwrap_or_default()
        );
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let server = StubServer::start(429, "{}").await;
        let err = source_for(&server).fetch("MSFT").await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::RateLimited);
        assert_eq!(err.symbol, "MSFT");
    }

    #[tokio::test]
    async fn other_error_statuses_are_transport_errors() {
        let server = StubServer::start(503, "unavailable").await;
        let err = source_for(&server).fetch("MSFT").await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Transport);
        assert!(err.message.contains("503"), "unexpected message: {}", err.message);
    }

    #[tokio::test]
    async fn provider_notice_in_ok_response_is_classified() {
        let server = StubServer::start(
            200,
            r#"{"Information": "Our standard API rate limit is 25 requests per day."}"#,
        )
        .await;
        let err = source_for(&server).fetch("MSFT").await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let source = AlphaVantageSource::with_client(
            StubServer::client(),
            "secret",
            "http://127.0.0.1:9/query",
        );
        let err = source.fetch("MSFT").await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Transport);
    }
}
