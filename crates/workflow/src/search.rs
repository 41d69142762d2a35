//! `search`: query named sources and store the raw results.
//!
//! Each source is independent. A source that errors is logged and
//! contributes nothing; the step itself only fails on a malformed step.

use agentrelay_core::error::StepError;
use agentrelay_core::{ExecutionContext, StepAction, StepHandler, StepOutput, WorkflowStep};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A searchable backend, addressed by name from a step's `sources` list.
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<Value>, StepError>;
}

/// Dispatches a search step to the sources it names.
#[derive(Default)]
pub struct SearchHandler {
    sources: HashMap<String, Arc<dyn SearchSource>>,
}

impl SearchHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn SearchSource>) -> Self {
        self.sources.insert(source.name().to_string(), source);
        self
    }
}

#[async_trait]
impl StepHandler for SearchHandler {
    fn action(&self) -> &str {
        "search"
    }

    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, StepError> {
        let StepAction::Search { sources, queries } = &step.action else {
            return Err(crate::mismatched(self.action()));
        };

        let mut results = Vec::new();
        for name in sources {
            let Some(source) = self.sources.get(name) else {
                warn!(source = %name, "No search source registered under this name");
                continue;
            };
            info!(agent_id = %ctx.agent_id, source = %name, "Searching");
            match source.search(queries).await {
                Ok(found) => results.extend(found),
                Err(e) => warn!(source = %name, error = %e, "Search source failed"),
            }
        }

        let count = results.len();
        ctx.search_results = Some(results);
        Ok(json!({ "count": count, "sources": sources }))
    }
}

const REDDIT_USER_AGENT: &str = "Mozilla/5.0 (compatible; ScoutBot/1.0)";

/// Searches one subreddit through Reddit's public JSON endpoint.
pub struct RedditSource {
    subreddit: String,
    limit: u32,
    client: reqwest::Client,
}

impl RedditSource {
    pub fn new(subreddit: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(REDDIT_USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            subreddit: subreddit.into(),
            limit: 25,
            client,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl SearchSource for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn search(&self, query: &str) -> Result<Vec<Value>, StepError> {
        let url = format!("https://www.reddit.com/r/{}/search.json", self.subreddit);
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| StepError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StepError::Network(format!(
                "reddit returned {}",
                response.status().as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StepError::Network(e.to_string()))?;
        Ok(extract_reddit_posts(&body))
    }
}

/// Flatten a Reddit listing into `{title, selftext, url, author, score}` items.
pub fn extract_reddit_posts(listing: &Value) -> Vec<Value> {
    let Some(children) = listing["data"]["children"].as_array() else {
        return Vec::new();
    };
    children
        .iter()
        .map(|child| {
            let post = &child["data"];
            let permalink = post["permalink"].as_str().unwrap_or_default();
            json!({
                "title": post["title"],
                "selftext": post["selftext"],
                "url": format!("https://reddit.com{permalink}"),
                "author": post["author"],
                "score": post["score"],
            })
        })
        .collect()
}
