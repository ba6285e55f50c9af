use crate::core::error::RateError;
use crate::core::provider::{HealthCheck, RateTableProvider};
use crate::core::rate::{
    BASE_CURRENCY, ConversionRequest, ConversionResult, DataSource, RateTable, normalize_code,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Client for the exchange-rate backend REST API.
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    base: String,
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Debug, Serialize)]
struct ConvertBody<'a> {
    amount: f64,
    from_currency: &'a str,
    to_currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    amount: f64,
    from_currency: String,
    to_currency: String,
    rate: f64,
    converted_amount: f64,
    timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateChange {
    pub currency_pair: String,
    pub rate: f64,
    pub previous_rate: Option<f64>,
    #[serde(default)]
    pub change_amount: f64,
    #[serde(default)]
    pub change_percentage: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LatestRates {
    pub rates: Vec<RateChange>,
    #[serde(default)]
    pub is_realtime: bool,
    #[serde(default)]
    pub data_source: Option<String>,
}

impl LatestRates {
    pub fn source(&self) -> DataSource {
        self.data_source
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if self.is_realtime {
                DataSource::Realtime
            } else {
                DataSource::Stored
            })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryPoint {
    pub date: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateHistory {
    pub from_currency: String,
    pub to_currency: String,
    pub current_rate: f64,
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
}

#[derive(Debug, Deserialize)]
struct CurrenciesResponse {
    currencies: Vec<String>,
}

/// Days of history the backend accepts; requests are clamped to this range.
pub const HISTORY_DAYS: std::ops::RangeInclusive<u32> = 1..=30;

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("xrate/1.0")
            .timeout(timeout)
            .build()?;
        Ok(BackendClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, RateError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::network(format!("Request error: {e} for URL: {url}")))?;
        read_json(response, endpoint).await
    }

    /// Asks the backend to perform the conversion itself.
    #[instrument(
        name = "BackendConvert",
        skip(self, request),
        fields(from = %request.from_currency, to = %request.to_currency)
    )]
    pub async fn convert_remote(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, RateError> {
        request.validate()?;
        let endpoint = "/exchange/convert";
        let url = format!("{}{}", self.base_url, endpoint);
        let body = ConvertBody {
            amount: request.amount,
            from_currency: &request.from_currency,
            to_currency: &request.to_currency,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RateError::network(format!("Request error: {e} for URL: {url}")))?;
        let data: ConvertResponse = read_json(response, endpoint).await?;

        // The backend reports a missing target currency as a zero rate
        if !(data.rate.is_finite() && data.rate > 0.0) {
            return Err(RateError::UnknownCurrency(normalize_code(&data.to_currency)));
        }

        Ok(ConversionResult {
            from_currency: normalize_code(&data.from_currency),
            to_currency: normalize_code(&data.to_currency),
            amount: data.amount,
            rate: data.rate,
            converted_amount: data.converted_amount,
            timestamp: data
                .timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
            data_source: DataSource::Realtime,
        })
    }

    /// Latest stored rates with their change against the previous day.
    pub async fn latest_rates(&self) -> Result<LatestRates, RateError> {
        self.get_json("/exchange/rates/latest").await
    }

    pub async fn rate_history(
        &self,
        from: &str,
        to: &str,
        days: u32,
    ) -> Result<RateHistory, RateError> {
        let days = days.clamp(*HISTORY_DAYS.start(), *HISTORY_DAYS.end());
        let endpoint = format!(
            "/exchange/rates/history?from_currency={}&to_currency={}&days={}",
            normalize_code(from),
            normalize_code(to),
            days
        );
        self.get_json(&endpoint).await
    }

    pub async fn currencies(&self) -> Result<Vec<String>, RateError> {
        let data: CurrenciesResponse = self.get_json("/exchange/currencies").await?;
        Ok(data.currencies)
    }
}

async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &str,
) -> Result<T, RateError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| format!(": {}", e.detail))
            .unwrap_or_default();
        return Err(RateError::network(format!(
            "HTTP error: {status} for {endpoint}{detail}"
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| RateError::network(format!("Failed to parse response for {endpoint}: {e}")))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

#[async_trait]
impl RateTableProvider for BackendClient {
    #[instrument(name = "BackendRatesFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<RateTable, RateError> {
        let endpoint = format!("/exchange/rates?base={BASE_CURRENCY}");
        let data: RatesResponse = self.get_json(&endpoint).await?;

        if normalize_code(&data.base) != BASE_CURRENCY {
            return Err(RateError::network(format!(
                "Unexpected base currency {} in rates response",
                data.base
            )));
        }
        let table = RateTable::usd(data.rates);
        debug!(currencies = table.len(), "Received rate table");
        Ok(table)
    }
}

#[async_trait]
impl HealthCheck for BackendClient {
    async fn health_check(&self) -> Result<(), RateError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::network(format!("Health check failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RateError::network(format!(
                "Health check failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exchange/rates"))
            .and(query_param("base", "USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"base": "USD", "rates": {"KRW": 1340.5, "JPY": 150.0}, "timestamp": "2024-01-01"}"#,
            ))
            .mount(&mock_server)
            .await;

        let table = client(&mock_server).fetch_rates().await.unwrap();
        assert_eq!(table.get("KRW"), Some(1340.5));
        assert_eq!(table.get("JPY"), Some(150.0));
        assert_eq!(table.get("USD"), Some(1.0));
    }

    #[tokio::test]
    async fn test_rates_api_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exchange/rates"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"detail": "upstream unavailable"}"#),
            )
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).fetch_rates().await;
        assert_eq!(
            result,
            Err(RateError::NetworkFailure(
                "HTTP error: 400 Bad Request for /exchange/rates?base=USD: upstream unavailable"
                    .to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_rates_api_malformed_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exchange/rates"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"base": "USD"}"#))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).fetch_rates().await;
        match result {
            Err(RateError::NetworkFailure(msg)) => {
                assert!(msg.contains("Failed to parse response for /exchange/rates"))
            }
            other => panic!("Expected network failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rates_with_wrong_base_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exchange/rates"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"base": "EUR", "rates": {"USD": 1.09}}"#),
            )
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).fetch_rates().await;
        assert!(matches!(result, Err(RateError::NetworkFailure(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let client = BackendClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            client.fetch_rates().await,
            Err(RateError::NetworkFailure(_))
        ));
        assert!(matches!(
            client.health_check().await,
            Err(RateError::NetworkFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status": "healthy"}"#))
            .mount(&mock_server)
            .await;
        assert!(client(&mock_server).health_check().await.is_ok());

        let failing_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&failing_server)
            .await;
        assert!(client(&failing_server).health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_convert_remote() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/exchange/convert"))
            .and(body_json(serde_json::json!({
                "amount": 100.0,
                "from_currency": "USD",
                "to_currency": "KRW"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "amount": 100.0,
                    "from_currency": "USD",
                    "to_currency": "KRW",
                    "rate": 1340.5,
                    "converted_amount": 134050.0,
                    "timestamp": "2024-03-01T09:30:00.123456"
                }"#,
            ))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .convert_remote(&ConversionRequest::new("usd", "krw", 100.0))
            .await
            .unwrap();
        assert_eq!(result.rate, 1340.5);
        assert_eq!(result.converted_amount, 134050.0);
        assert_eq!(result.data_source, DataSource::Realtime);
        assert_eq!(result.timestamp.to_rfc3339(), "2024-03-01T09:30:00.123456+00:00");
    }

    #[tokio::test]
    async fn test_convert_remote_zero_rate_is_unknown_currency() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/exchange/convert"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"amount": 1.0, "from_currency": "USD", "to_currency": "ZZZ", "rate": 0.0, "converted_amount": 0.0}"#,
            ))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .convert_remote(&ConversionRequest::new("USD", "ZZZ", 1.0))
            .await;
        assert_eq!(result, Err(RateError::UnknownCurrency("ZZZ".to_string())));
    }

    #[tokio::test]
    async fn test_latest_rates() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exchange/rates/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "rates": [{
                        "currency_pair": "USD/KRW",
                        "rate": 1340.5,
                        "previous_rate": 1330.0,
                        "change_amount": 10.5,
                        "change_percentage": 0.79,
                        "date": "2024-03-01"
                    }],
                    "is_realtime": false,
                    "data_source": "cached"
                }"#,
            ))
            .mount(&mock_server)
            .await;

        let latest = client(&mock_server).latest_rates().await.unwrap();
        assert_eq!(latest.rates.len(), 1);
        assert_eq!(latest.rates[0].previous_rate, Some(1330.0));
        assert_eq!(latest.source(), DataSource::Stored);
    }

    #[tokio::test]
    async fn test_rate_history() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exchange/rates/history"))
            .and(query_param("from_currency", "USD"))
            .and(query_param("to_currency", "KRW"))
            .and(query_param("days", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "from_currency": "USD",
                    "to_currency": "KRW",
                    "current_rate": 1340.5,
                    "history": [{"date": "today", "rate": 1340.5}]
                }"#,
            ))
            .mount(&mock_server)
            .await;

        let history = client(&mock_server)
            .rate_history("usd", "krw", 7)
            .await
            .unwrap();
        assert_eq!(history.current_rate, 1340.5);
        assert_eq!(history.history.len(), 1);
    }

    #[tokio::test]
    async fn test_currencies() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exchange/currencies"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"currencies": ["EUR", "KRW", "USD"], "count": 3}"#,
            ))
            .mount(&mock_server)
            .await;

        let currencies = client(&mock_server).currencies().await.unwrap();
        assert_eq!(currencies, vec!["EUR", "KRW", "USD"]);
    }
}
