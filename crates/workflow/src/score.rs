//! `score`: keyword scoring of search results into levels.

use agentrelay_core::error::StepError;
use agentrelay_core::{ExecutionContext, StepAction, StepHandler, StepOutput, WorkflowStep};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

const HOT_THRESHOLD: u32 = 70;
const WARM_THRESHOLD: u32 = 50;

/// Reads `search_results`, writes `scored_results` with `score` and `level`
/// set on every item.
pub struct ScoreHandler;

#[async_trait]
impl StepHandler for ScoreHandler {
    fn action(&self) -> &str {
        "score"
    }

    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, StepError> {
        let StepAction::Score { method, output } = &step.action else {
            return Err(crate::mismatched(self.action()));
        };

        let items = ctx.search_results.as_deref().unwrap_or(&[]);
        let scored: Vec<Value> = items
            .iter()
            .map(|item| {
                let score = score_item(item, method);
                let mut item = item.clone();
                if let Some(obj) = item.as_object_mut() {
                    obj.insert("score".into(), json!(score));
                    obj.insert("level".into(), json!(level_for(score, output)));
                }
                item
            })
            .collect();

        let mut counts = Map::new();
        for level in output {
            let n = scored
                .iter()
                .filter(|s| s["level"].as_str() == Some(level.as_str()))
                .count();
            counts.insert(level.clone(), json!(n));
        }

        let total = scored.len();
        ctx.scored_results = Some(scored);
        Ok(json!({ "total": total, "counts": counts }))
    }
}

/// Score one item; only the `bant` method awards points. Capped at 100.
pub fn score_item(item: &Value, method: &str) -> u32 {
    if method != "bant" {
        return 0;
    }
    let text = format!(
        "{} {}",
        item["title"].as_str().unwrap_or_default(),
        item["selftext"].as_str().unwrap_or_default()
    )
    .to_lowercase();

    let mut score = 0;
    if text.contains("hiring") {
        score += 30;
    }
    if text.contains("need") {
        score += 20;
    }
    if text.contains("budget") || text.contains('$') {
        score += 35;
    }
    if text.contains("missed call") || text.contains("losing sales") {
        score += 25;
    }
    score.min(100)
}

/// Map a score onto the first enabled level it reaches; falls back to `cold`.
pub fn level_for(score: u32, levels: &[String]) -> &'static str {
    let enabled = |name: &str| levels.iter().any(|l| l == name);
    if score >= HOT_THRESHOLD && enabled("hot") {
        "hot"
    } else if score >= WARM_THRESHOLD && enabled("warm") {
        "warm"
    } else {
        "cold"
    }
}
