use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use stockchat::core::{Role, Session};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Adds automatic logging to test
mod test_utils {
    use super::*;

    pub async fn create_yahoo_mock_server(symbol: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    /// Completion server answering the first request with a function call and
    /// every later one with `followup`.
    pub async fn create_openai_mock_server(
        name: &str,
        arguments: &str,
        followup: &str,
    ) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"function_call": "auto"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "function_call": {"name": name, "arguments": arguments}
                    },
                    "finish_reason": "function_call"
                }]
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": followup},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn chart_response(closes: &[f64]) -> String {
        let start = 1704205800i64;
        let timestamps: Vec<i64> = (0..closes.len() as i64).map(|i| start + i * 86_400).collect();
        json!({
            "chart": {
                "result": [{
                    "meta": {"currency": "USD"},
                    "timestamp": timestamps,
                    "indicators": {"quote": [{"close": closes}]}
                }],
                "error": null
            }
        })
        .to_string()
    }

    /// Writes a config pointing both providers at the mocks and returns its
    /// path together with the data directory.
    pub fn write_config(dir: &Path, openai_uri: &str, yahoo_uri: &str) -> (PathBuf, PathBuf) {
        let key_path = dir.join("API_key");
        fs::write(&key_path, "sk-integration").expect("Failed to write key file");

        let data_dir = dir.join("data");
        let config_path = dir.join("config.yaml");
        let config_content = format!(
            r#"
model: "gpt-4o-mini"
providers:
  openai:
    base_url: "{openai_uri}"
    api_key_file: "{}"
    timeout_secs: 10
  yahoo:
    base_url: "{yahoo_uri}"
chart_path: "{}"
data_path: "{}"
"#,
            key_path.display(),
            dir.join("stock.svg").display(),
            data_dir.display()
        );
        fs::write(&config_path, config_content).expect("Failed to write config file");
        (config_path, data_dir)
    }
}

fn saved_session(data_dir: &Path) -> Session {
    Session::load(data_dir.join("session.json")).expect("Session should be saved")
}

#[test_log::test(tokio::test)]
async fn test_price_question_flow_with_mock() {
    let closes = [188.0, 190.5, 192.25];
    let yahoo = test_utils::create_yahoo_mock_server(
        "AAPL",
        200,
        &test_utils::chart_response(&closes),
    )
    .await;
    let openai = test_utils::create_openai_mock_server(
        "get_stock_price",
        r#"{"ticker": "AAPL"}"#,
        "Apple's latest closing price is $192.25.",
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (config_path, data_dir) = test_utils::write_config(dir.path(), &openai.uri(), &yahoo.uri());

    let result = stockchat::run_command(
        stockchat::AppCommand::Ask {
            question: "What is Apple's stock price?".to_string(),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Ask failed with: {:?}", result.err());

    let session = saved_session(&data_dir);
    let messages = session.conversation.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[2].role, Role::Function);
    assert_eq!(messages[2].content.as_deref(), Some("192.25"));
    assert_eq!(
        messages[3].content.as_deref(),
        Some("Apple's latest closing price is $192.25.")
    );

    let requests = openai.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let auth = requests[0].headers.get("authorization").unwrap();
    assert_eq!(auth.to_str().unwrap(), "Bearer sk-integration");

    let followup: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert!(followup.get("functions").is_none());
    assert_eq!(followup["messages"].as_array().unwrap().len(), 3);
    assert_eq!(followup["messages"][2]["role"], "function");
    assert_eq!(followup["messages"][2]["name"], "get_stock_price");
}

#[test_log::test(tokio::test)]
async fn test_plot_flow_with_mock() {
    let yahoo = test_utils::create_yahoo_mock_server(
        "TSLA",
        200,
        &test_utils::chart_response(&[240.0, 251.3, 248.7, 255.1]),
    )
    .await;
    let openai = test_utils::create_openai_mock_server(
        "plot_stock_price",
        r#"{"ticker": "TSLA"}"#,
        "unused",
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (config_path, data_dir) = test_utils::write_config(dir.path(), &openai.uri(), &yahoo.uri());

    let result = stockchat::run_command(
        stockchat::AppCommand::Ask {
            question: "Plot Tesla's stock".to_string(),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Ask failed with: {:?}", result.err());

    assert!(dir.path().join("stock.svg").exists());
    let session = saved_session(&data_dir);
    assert_eq!(session.conversation.len(), 1);
    assert_eq!(openai.received_requests().await.unwrap().len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_unknown_ticker_keeps_user_message() {
    let yahoo = test_utils::create_yahoo_mock_server(
        "XYZABC123",
        404,
        r#"{"chart":{"result":null,"error":{
            "code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
    )
    .await;
    let openai = test_utils::create_openai_mock_server(
        "get_stock_price",
        r#"{"ticker": "XYZABC123"}"#,
        "unused",
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (config_path, data_dir) = test_utils::write_config(dir.path(), &openai.uri(), &yahoo.uri());

    let result = stockchat::run_command(
        stockchat::AppCommand::Ask {
            question: "What is the price of XYZABC123?".to_string(),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    let err = result.expect_err("Unknown ticker should fail the turn");
    assert!(err.is::<stockchat::cli::chat::TurnFailed>());
    assert!(err.to_string().contains("No market data available for XYZABC123"));

    let session = saved_session(&data_dir);
    assert_eq!(session.conversation.len(), 1);
    assert_eq!(
        session.conversation.messages()[0].content.as_deref(),
        Some("What is the price of XYZABC123?")
    );
}

#[test_log::test(tokio::test)]
async fn test_reset_and_history_commands() {
    let dir = TempDir::new().unwrap();
    let (config_path, data_dir) =
        test_utils::write_config(dir.path(), "http://127.0.0.1:9", "http://127.0.0.1:9");

    let mut session = Session::new();
    session.conversation.push_user("Hello");
    session.conversation.push_assistant("Hi there");
    session.save(data_dir.join("session.json")).unwrap();

    let config = Some(config_path.to_str().unwrap());
    stockchat::run_command(stockchat::AppCommand::History, config)
        .await
        .expect("History should succeed");
    stockchat::run_command(stockchat::AppCommand::Reset, config)
        .await
        .expect("Reset should succeed");
    assert!(!data_dir.join("session.json").exists());
}
