use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use ws_core::{Result, WsError};

/// View onto a companion's health and activity endpoints, as seen from the
/// control plane.
#[async_trait]
pub trait CompanionProbe: Send + Sync {
    /// Whether the companion answers its liveness endpoint.
    async fn is_live(&self, base_url: &str, token: Option<&str>) -> bool;

    /// Number of currently open client connections to the companion. Used
    /// only as an idle-detection signal.
    async fn open_connections(&self, base_url: &str, token: Option<&str>) -> Result<u64>;
}

#[derive(Debug, Deserialize)]
struct ConnectionsBody {
    connections: u64,
}

/// HTTP implementation probing the companion's `/health/live` and
/// `/metrics/connections` endpoints.
#[derive(Clone)]
pub struct HttpCompanionProbe {
    client: reqwest::Client,
}

impl HttpCompanionProbe {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| WsError::Provisioning(format!("could not build http client: {e}")))?;
        Ok(Self { client })
    }

    fn get(&self, url: String, token: Option<&str>) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait]
impl CompanionProbe for HttpCompanionProbe {
    async fn is_live(&self, base_url: &str, token: Option<&str>) -> bool {
        let url = format!("{}/health/live", base_url.trim_end_matches('/'));
        match self.get(url, token).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn open_connections(&self, base_url: &str, token: Option<&str>) -> Result<u64> {
        let url = format!("{}/metrics/connections", base_url.trim_end_matches('/'));
        let response = self
            .get(url, token)
            .send()
            .await
            .map_err(|e| WsError::Teardown(format!("companion unreachable: {e}")))?;
        if !response.status().is_success() {
            return Err(WsError::Teardown(format!(
                "companion metrics returned {}",
                response.status()
            )));
        }
        let body: ConnectionsBody = response
            .json()
            .await
            .map_err(|e| WsError::Teardown(format!("bad metrics payload: {e}")))?;
        Ok(body.connections)
    }
}
