//! `enrich`: narrow scored results to hot and warm leads and add fields.

use agentrelay_core::error::StepError;
use agentrelay_core::{ExecutionContext, StepAction, StepHandler, StepOutput, WorkflowStep};
use async_trait::async_trait;
use serde_json::{Value, json};

const ENRICHED_LEVELS: &[&str] = &["hot", "warm"];

pub struct EnrichHandler;

#[async_trait]
impl StepHandler for EnrichHandler {
    fn action(&self) -> &str {
        "enrich"
    }

    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, StepError> {
        let StepAction::Enrich { find, persona } = &step.action else {
            return Err(crate::mismatched(self.action()));
        };

        let items = ctx.scored_results.as_deref().unwrap_or(&[]);
        let enriched: Vec<Value> = items
            .iter()
            .filter(|item| {
                item["level"]
                    .as_str()
                    .is_some_and(|l| ENRICHED_LEVELS.contains(&l))
            })
            .map(|item| {
                let mut item = item.clone();
                let values: Vec<(String, Value)> = find
                    .iter()
                    .map(|field| (field.clone(), enrich_field(&item, field, persona.as_deref())))
                    .collect();
                if let Some(obj) = item.as_object_mut() {
                    obj.extend(values);
                }
                item
            })
            .collect();

        let n = enriched.len();
        ctx.enriched_results = Some(enriched);
        Ok(json!({ "enriched": n }))
    }
}

/// Placeholder value for one requested field.
fn enrich_field(item: &Value, field: &str, _persona: Option<&str>) -> Value {
    if field == "email" {
        let title: String = item["title"]
            .as_str()
            .map(|t| t.chars().take(30).collect())
            .unwrap_or_else(|| "unknown".into());
        json!(format!("[enrichment-pending] for {title}"))
    } else {
        json!("[pending]")
    }
}
