use super::error::DispatchError;
use super::routes::RemoteRoute;
use crate::application::ports::MutationDispatcher;
use crate::domain::entities::PendingAction;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

/// Dispatches queued actions to the invoicing REST API.
pub struct HttpMutationDispatcher {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpMutationDispatcher {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: reqwest::Client, config: &RemoteConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            AppError::ConfigurationError(format!("Invalid base_url {}: {err}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::ConfigurationError(format!(
                "Remote base_url cannot carry paths: {}",
                config.base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone(),
        })
    }

    async fn send(&self, action: &PendingAction) -> Result<Option<Value>, DispatchError> {
        let kind = action.kind();
        let route = RemoteRoute::for_payload(&action.payload)
            .map_err(|err| DispatchError::Request(err.to_string()))?;
        let url = route.url(&self.base_url).ok_or_else(|| {
            DispatchError::Request(format!("Cannot build {} from {}", route.path(), self.base_url))
        })?;

        let mut request = self.client.request(route.method.clone(), url.clone());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &route.body {
            request = request.json(body);
        }

        tracing::debug!(
            target: "offline::replay",
            kind = %kind,
            method = %route.method,
            url = %url,
            "dispatching action"
        );
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                kind,
                status: status.as_u16(),
                body,
            });
        }

        if !kind.creates_entity() {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_slice(&bytes)
            .map_err(|err| DispatchError::Decode(err.to_string()))?;
        Ok(Some(value))
    }
}

#[async_trait]
impl MutationDispatcher for HttpMutationDispatcher {
    async fn dispatch(&self, action: &PendingAction) -> Result<Option<Value>, AppError> {
        self.send(action).await.map_err(AppError::from)
    }
}
