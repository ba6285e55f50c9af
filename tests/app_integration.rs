use std::fs;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(health_status: u16, rates_response: Option<&str>) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(health_status).set_body_string(r#"{"status": "healthy"}"#))
            .mount(&mock_server)
            .await;

        let rates = match rates_response {
            Some(body) => ResponseTemplate::new(200).set_body_string(body),
            None => ResponseTemplate::new(500).set_body_string(r#"{"detail": "upstream down"}"#),
        };
        Mock::given(method("GET"))
            .and(path("/exchange/rates"))
            .and(query_param("base", "USD"))
            .respond_with(rates)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn write_config(dir: &tempfile::TempDir, base_url: &str) -> std::path::PathBuf {
        let config_path = dir.path().join("config.yaml");
        let config_content = format!(
            r#"
            api:
              base_url: "{}"
              timeout_secs: 2
            data_path: "{}"
        "#,
            base_url,
            dir.path().display()
        );
        std::fs::write(&config_path, config_content).expect("Failed to write config file");
        config_path
    }
}

fn convert_command(amount: &str, from: &str, to: &str) -> xrate::AppCommand {
    xrate::AppCommand::Convert {
        amount: amount.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        remote: false,
    }
}

#[test_log::test(tokio::test)]
async fn test_convert_with_live_rates() {
    let mock_response = r#"{"base": "USD", "rates": {"KRW": 1350.0, "EUR": 0.9}, "timestamp": "2024-03-01T00:00:00"}"#;
    let mock_server = test_utils::create_mock_server(200, Some(mock_response)).await;

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(&dir, &mock_server.uri());
    info!(config = %fs::read_to_string(&config_path).unwrap(), "Using config");

    let result = xrate::run_command(
        convert_command("1,000", "usd", "krw"),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Conversion failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_convert_survives_backend_outage() {
    let mock_server = test_utils::create_mock_server(503, None).await;

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(&dir, &mock_server.uri());

    let result = xrate::run_command(
        convert_command("100", "USD", "JPY"),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Fallback conversion failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_convert_rejects_invalid_amount() {
    let mock_server = test_utils::create_mock_server(200, None).await;

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(&dir, &mock_server.uri());

    let result = xrate::run_command(
        convert_command("abc", "USD", "KRW"),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    let err = result.expect_err("non-numeric amount should fail");
    assert!(err.to_string().contains("Invalid amount"), "unexpected error: {err}");
}

#[test_log::test(tokio::test)]
async fn test_rates_and_status_commands() {
    let mock_response = r#"{"base": "USD", "rates": {"KRW": 1350.0, "JPY": 150.0}}"#;
    let mock_server = test_utils::create_mock_server(200, Some(mock_response)).await;

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config_path = test_utils::write_config(&dir, &mock_server.uri());
    let config_path = config_path.to_str().unwrap();

    // /exchange/rates/latest is not mocked, so the change column is left empty
    let rates = xrate::run_command(xrate::AppCommand::Rates, Some(config_path)).await;
    assert!(rates.is_ok(), "Rates failed with: {:?}", rates.err());

    let status = xrate::run_command(xrate::AppCommand::Status, Some(config_path)).await;
    assert!(status.is_ok(), "Status failed with: {:?}", status.err());
}
