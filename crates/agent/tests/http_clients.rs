use boxer_agent::{
    AnthropicClient, AppUserDirectory, HttpAppUserDirectory, LlmClient, LlmError, LookupError,
    OllamaClient,
};
use boxer_core::config::{AnthropicConfig, AppUserApiConfig, OllamaConfig};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), String>;

fn anthropic_config(base_url: String) -> AnthropicConfig {
    AnthropicConfig {
        api_key: Some("sk-ant-test".to_string().into()),
        base_url,
        model: "claude-sonnet-4-6".to_string(),
        max_tokens: 700,
        timeout_secs: 5,
    }
}

fn ollama_config(base_url: String) -> OllamaConfig {
    OllamaConfig { base_url, model: "qwen2.5:1.5b".to_string(), timeout_secs: 5, temperature: 0.0 }
}

async fn only_request_body(server: &MockServer) -> Result<serde_json::Value, String> {
    let requests = server.received_requests().await.unwrap_or_default();
    let [request] = requests.as_slice() else {
        return Err(format!("expected one request, got {}", requests.len()));
    };
    request.body_json().map_err(|err| err.to_string())
}

#[tokio::test]
async fn anthropic_posts_messages_with_version_header() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": " 요약: 괜찮아 "}],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        AnthropicClient::new(&anthropic_config(server.uri())).map_err(|err| err.to_string())?;
    let answer = client.complete("system text", "질문").await.map_err(|err| err.to_string())?;

    if answer != "요약: 괜찮아" {
        return Err(format!("unexpected answer `{answer}`"));
    }
    let body = only_request_body(&server).await?;
    if body["system"] != "system text" || body["messages"][0]["content"] != "질문" {
        return Err(format!("unexpected body {body}"));
    }
    if body["model"] != "claude-sonnet-4-6" || body["max_tokens"] != 700 {
        return Err(format!("model settings should be forwarded: {body}"));
    }
    Ok(())
}

#[tokio::test]
async fn ollama_error_status_carries_bounded_detail() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string(r#"{"error":"model 'qwen2.5:1.5b' not found"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_config(server.uri())).map_err(|err| err.to_string())?;
    let result = client.complete("system", "질문").await;

    match result {
        Err(LlmError::Api { status: 500, detail, .. }) if detail.contains("not found") => {}
        other => return Err(format!("unexpected result {other:?}")),
    }
    let body = only_request_body(&server).await?;
    if body["stream"] != false || body["model"] != "qwen2.5:1.5b" {
        return Err(format!("unexpected body {body}"));
    }
    Ok(())
}

#[tokio::test]
async fn ollama_invalid_json_is_reported() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_config(server.uri())).map_err(|err| err.to_string())?;
    let result = client.complete("system", "질문").await;

    if matches!(result, Err(LlmError::InvalidResponse { .. })) {
        Ok(())
    } else {
        Err(format!("unexpected result {result:?}"))
    }
}

#[tokio::test]
async fn app_user_lookup_sends_the_barcode_and_reads_data() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/internal/app-users"))
        .and(query_param("barcode", "01234567890"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"userSeq": 1, "userPhoneNumber": "010", "userRealName": "김", "babies": []}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let directory = HttpAppUserDirectory::new(&AppUserApiConfig {
        url: format!("{}/internal/app-users", server.uri()),
        timeout_secs: 5,
    })
    .map_err(|err| err.to_string())?;
    let users = directory.find_by_barcode("01234567890").await.map_err(|err| err.to_string())?;

    if users.len() != 1 {
        return Err(format!("expected one user, got {users:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn app_user_lookup_http_errors_keep_status() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"message":"forbidden"}"#))
        .mount(&server)
        .await;

    let directory =
        HttpAppUserDirectory::new(&AppUserApiConfig { url: server.uri(), timeout_secs: 5 })
            .map_err(|err| err.to_string())?;
    let result = directory.find_by_barcode("01234567890").await;

    match result {
        Err(LookupError::Api { status: 403, detail }) if detail.contains("forbidden") => Ok(()),
        other => Err(format!("unexpected result {other:?}")),
    }
}
