//! `agentrelay emit`: store an event and act on its trigger rule.

use super::CmdResult;

pub async fn run(event_type: &str, payload: Option<&str>) -> CmdResult {
    let payload = super::parse_payload(payload, "payload")?;
    let orchestrator = super::open()?;

    let emitted = orchestrator.emit(event_type, payload).await?;
    println!("{}", serde_json::to_string_pretty(&emitted.event)?);

    match &emitted.scheduled {
        Some(invocation) => println!(
            "\n⚡ Triggered {} ({}, {})",
            invocation.agent_id, invocation.priority, invocation.status
        ),
        None => println!("\n  No trigger matched"),
    }

    orchestrator.wait_idle().await;
    Ok(())
}
