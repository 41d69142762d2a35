pub mod agents;
pub mod emit;
pub mod events;
pub mod init;
pub mod process;
pub mod run;
pub mod skills;
pub mod status;

use agentrelay_config::AppConfig;
use agentrelay_core::Payload;
use agentrelay_orchestrator::Orchestrator;
use std::sync::Arc;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

fn open() -> Result<Arc<Orchestrator>, Box<dyn std::error::Error>> {
    let config = load_config()?;
    tracing::debug!(data_dir = %config.paths.data_dir.display(), "Opening orchestrator");
    Ok(Orchestrator::open(config).map_err(|e| format!("Failed to start: {e}"))?)
}

/// Parse an optional JSON object argument; absent means empty.
fn parse_payload(raw: Option<&str>, what: &str) -> Result<Payload, Box<dyn std::error::Error>> {
    match raw {
        None => Ok(Payload::new()),
        Some(raw) => Ok(serde_json::from_str(raw)
            .map_err(|e| format!("{what} must be a JSON object: {e}"))?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_parsing() {
        assert!(parse_payload(None, "input").unwrap().is_empty());
        let p = parse_payload(Some(r#"{"hotCount": 3}"#), "input").unwrap();
        assert_eq!(p["hotCount"], 3);
        assert!(parse_payload(Some("[1, 2]"), "input").is_err());
        assert!(parse_payload(Some("{oops"), "payload").is_err());
    }
}
