use crate::application::ports::ConnectivityProbe;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

pub struct HttpHealthProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpHealthProbe {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/health", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpHealthProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(
                    target: "offline::connectivity",
                    url = %self.url,
                    error = %err,
                    "health probe failed"
                );
                false
            }
        }
    }
}
