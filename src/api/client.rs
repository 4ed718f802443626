//! HTTP client for the control server's request/response endpoints

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::camera::CameraUpdate;
use crate::config::Config;
use crate::data::{Envelope, LoopStatus, PersonaCatalog, StateSnapshot, TimelineEvent};

use super::commands::RemoteCommand;
use super::error::ApiError;

const API_KEY_HEADER: &str = "x-api-key";

/// Body of `GET /api/actions/history`
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    events: Vec<Value>,
}

/// Body of `GET /api/actions/catalog`
#[derive(Debug, Deserialize)]
struct ActionCatalogResponse {
    #[serde(default)]
    actions: Vec<String>,
}

/// Client for the control server's REST surface.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            api_token: config.server.api_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::Endpoint {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.header(API_KEY_HEADER, token),
            None => builder,
        }
    }

    async fn read_body(response: Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let response = self.request(Method::GET, url).send().await?;
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Full telemetry snapshot
    pub async fn fetch_state(&self) -> Result<StateSnapshot, ApiError> {
        self.get_json("api/state").await
    }

    /// Buffered event history, oldest first. Malformed entries are skipped.
    pub async fn fetch_history(&self) -> Result<Vec<TimelineEvent>, ApiError> {
        let history: HistoryResponse = self.get_json("api/actions/history").await?;
        let events = history
            .events
            .into_iter()
            .filter_map(|value| match Envelope::from_value(value) {
                Ok(envelope) => Some(TimelineEvent::from_envelope(envelope)),
                Err(e) => {
                    warn!("Skipping malformed history entry: {}", e);
                    None
                }
            })
            .collect();
        Ok(events)
    }

    pub async fn fetch_camera_status(&self) -> Result<CameraUpdate, ApiError> {
        let body: Map<String, Value> = self.get_json("api/camera/web-stream").await?;
        Ok(CameraUpdate::from_payload(&body))
    }

    pub async fn fetch_personas(&self) -> Result<PersonaCatalog, ApiError> {
        self.get_json("api/personas").await
    }

    pub async fn fetch_loops(&self) -> Result<LoopStatus, ApiError> {
        self.get_json("api/loops").await
    }

    pub async fn fetch_action_catalog(&self) -> Result<Vec<String>, ApiError> {
        let catalog: ActionCatalogResponse = self.get_json("api/actions/catalog").await?;
        Ok(catalog.actions)
    }

    /// Send a mutation and return the server's JSON reply
    pub async fn execute(&self, command: &RemoteCommand) -> Result<Value, ApiError> {
        let url = self.endpoint(command.path())?;
        debug!("POST {} ({})", url, command.label());
        let response = self
            .request(Method::POST, url)
            .json(&command.body())
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
