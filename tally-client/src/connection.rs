use crate::api_client::ApiClient;
use crate::settings::Credentials;
use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// How the client decides whether it is online.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Online when the backend host accepts a TCP connection within `timeout`.
    Probe { timeout: Duration },
    /// Fixed answer, from `--offline` or tests.
    Forced(bool),
}

impl Connectivity {
    pub async fn is_online(&self, credentials: &Credentials) -> bool {
        match self {
            Connectivity::Forced(online) => *online,
            Connectivity::Probe { timeout } => probe(&credentials.backend_url, *timeout).await,
        }
    }
}

async fn probe(backend_url: &str, timeout: Duration) -> bool {
    let Ok(url) = Url::parse(backend_url) else {
        return false;
    };
    let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
        return false;
    };

    let online = matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    );
    debug!(host, port, online, "connectivity probe");
    online
}

/// Result of a read-only authenticated request against the config endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    MissingCredentials,
    HttpFailure(u16),
    Failed(String),
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::MissingCredentials => write!(f, "Missing backend URL or API token"),
            ConnectionStatus::HttpFailure(status) => {
                write!(f, "Connection failed (HTTP {status})")
            }
            ConnectionStatus::Failed(message) => write!(f, "Connection failed: {message}"),
        }
    }
}

pub async fn test_connection(credentials: &Credentials, timeout: Duration) -> ConnectionStatus {
    if !credentials.is_complete() {
        return ConnectionStatus::MissingCredentials;
    }

    let probe = match ApiClient::new(credentials, timeout) {
        Ok(client) => client.probe_config().await,
        Err(e) => Err(e),
    };

    let probe = match probe {
        Ok(probe) => probe,
        Err(e) => return ConnectionStatus::Failed(e.to_string()),
    };

    if !probe.status.is_success() {
        return ConnectionStatus::HttpFailure(probe.status.as_u16());
    }

    let body = probe.body.unwrap_or_default();
    if body.get("status").and_then(|s| s.as_str()) == Some(tally_common::api::STATUS_OK) {
        return ConnectionStatus::Connected;
    }

    let detail = ["message", "code"]
        .iter()
        .filter_map(|key| body.get(*key))
        .filter_map(|v| match v {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .next()
        .unwrap_or_else(|| "Invalid response".to_string());
    ConnectionStatus::Failed(detail)
}
