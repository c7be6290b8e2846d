use chrono::{DateTime, Utc};
use colored::*;
use fleet_core::errors::FleetError;
use fleet_core::websocket::LogStreamClient;
use fleet_protocol::logs::{encode_query, LogQueryRequest, Severity};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("controller returned an error: {0}")]
    Controller(String),
    #[error("log stream failed: {0}")]
    Stream(String),
    #[error("{0}")]
    Validation(String),
}

impl From<reqwest::Error> for CliError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

impl From<FleetError> for CliError {
    fn from(value: FleetError) -> Self {
        Self::Stream(value.to_string())
    }
}

/// Record pushed through `POST /v1/logs`.
#[derive(Debug, Clone, Serialize)]
pub struct PushRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    pub entity: String,
    pub module: String,
    pub location: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PushResponse {
    pub accepted: usize,
}

#[derive(Debug, Deserialize)]
struct ControllerError {
    error: String,
}

pub struct ControllerClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ControllerClient {
    pub fn new(base_url: &str) -> Result<Self, CliError> {
        let url = Url::parse(base_url)
            .map_err(|err| CliError::Validation(format!("invalid controller URL: {err}")))?;
        Ok(Self {
            base_url: url,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CliError> {
        self.base_url
            .join(path)
            .map_err(|err| CliError::Validation(format!("invalid path: {err}")))
    }

    /// WebSocket URL of the log stream for `request`.
    pub fn stream_url(&self, request: &LogQueryRequest) -> Result<Url, CliError> {
        let mut url = self.endpoint("/v1/log")?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| CliError::Validation(format!("cannot stream over {}", url.scheme())))?;
        let query = encode_query(request);
        url.set_query((!query.is_empty()).then_some(query.as_str()));
        Ok(url)
    }

    pub async fn push_records(&self, records: &[PushRecord]) -> Result<PushResponse, CliError> {
        let url = self.endpoint("/v1/logs")?;
        let response = self.http.post(url).json(records).send().await?;
        parse_response(response).await
    }

    /// Opens the stream; an error notice from the controller is returned as
    /// [`CliError::Stream`].
    pub async fn open_stream(&self, request: &LogQueryRequest) -> Result<LogStreamClient, CliError> {
        let url = self.stream_url(request)?;
        Ok(LogStreamClient::connect(url.as_str()).await?)
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, CliError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| CliError::Http(err.to_string()))
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ControllerError>(&body) {
            Ok(err) => Err(CliError::Controller(format!("{status}: {}", err.error))),
            Err(_) => Err(CliError::Controller(format!("{status}: {body}"))),
        }
    }
}

pub fn print_pushed(response: &PushResponse) {
    println!(
        "{} {}",
        "✔ records accepted:".green().bold(),
        response.accepted
    );
}

pub fn print_stream_error(err: &CliError) {
    eprintln!("{} {}", "✘".red().bold(), err);
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn record() -> PushRecord {
        PushRecord {
            time: None,
            entity: "machine-0".into(),
            module: "juju.worker".into(),
            location: "".into(),
            severity: Severity::Info,
            message: "hello".into(),
            labels: Vec::new(),
        }
    }

    #[test]
    fn stream_url_switches_scheme_and_encodes_query() {
        let client = ControllerClient::new("http://127.0.0.1:17070").expect("client");
        let request = LogQueryRequest {
            include_entity: vec!["unit-*".into()],
            max_lines: 3,
            no_tail: true,
            ..Default::default()
        };

        let url = client.stream_url(&request).expect("url");
        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:17070/v1/log?includeEntity=unit-*&maxLines=3&noTail=true"
        );

        let secure = ControllerClient::new("https://controller.example").expect("client");
        let url = secure.stream_url(&LogQueryRequest::default()).expect("url");
        assert_eq!(url.as_str(), "wss://controller.example/v1/log");
    }

    #[test]
    fn rejects_invalid_controller_url() {
        assert!(matches!(
            ControllerClient::new("not a url"),
            Err(CliError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn push_records_posts_json_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/logs"))
            .and(body_json(serde_json::json!([{
                "entity": "machine-0",
                "module": "juju.worker",
                "location": "",
                "severity": "INFO",
                "message": "hello"
            }])))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"accepted": 1})))
            .mount(&server)
            .await;

        let client = ControllerClient::new(&server.uri()).expect("client");
        let response = client.push_records(&[record()]).await.expect("push");
        assert_eq!(response.accepted, 1);
    }

    #[tokio::test]
    async fn controller_errors_carry_the_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/logs"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "record 0 has no entity"})),
            )
            .mount(&server)
            .await;

        let client = ControllerClient::new(&server.uri()).expect("client");
        let err = client.push_records(&[record()]).await.unwrap_err();
        match err {
            CliError::Controller(message) => assert!(message.contains("record 0 has no entity")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
