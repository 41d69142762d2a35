//! `fetch`: HTTP GET a URL into `fetched_data`.

use agentrelay_core::error::StepError;
use agentrelay_core::{
    ExecutionContext, FetchFormat, StepAction, StepHandler, StepOutput, WorkflowStep,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

pub struct FetchHandler {
    client: reqwest::Client,
}

impl FetchHandler {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for FetchHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepHandler for FetchHandler {
    fn action(&self) -> &str {
        "fetch"
    }

    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, StepError> {
        let StepAction::Fetch {
            url,
            headers,
            format,
        } = &step.action
        else {
            return Err(crate::mismatched(self.action()));
        };

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(StepError::InvalidStep {
                action: "fetch".into(),
                reason: format!("URL must start with http:// or https://, got '{url}'"),
            });
        }

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(%url, "Fetching");
        let response = request
            .send()
            .await
            .map_err(|e| StepError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(StepError::ExecutionFailed {
                action: "fetch".into(),
                reason: format!("{url} returned HTTP {status}"),
            });
        }

        let content = match format {
            FetchFormat::Json => response
                .json::<Value>()
                .await
                .map_err(|e| StepError::ExecutionFailed {
                    action: "fetch".into(),
                    reason: format!("invalid JSON from {url}: {e}"),
                })?,
            FetchFormat::Text => Value::String(
                response
                    .text()
                    .await
                    .map_err(|e| StepError::Network(e.to_string()))?,
            ),
        };

        let size = content.to_string().len();
        ctx.fetched_data = Some(content);
        Ok(json!({ "url": url, "size": size }))
    }
}
