//! `agentrelay events`: show recent events.

use super::CmdResult;

pub async fn run(hours: Option<u64>) -> CmdResult {
    let orchestrator = super::open()?;
    let window = hours.unwrap_or(orchestrator.config().events.default_window_hours);
    let events = orchestrator.recent_events(Some(window)).await;

    if events.is_empty() {
        println!("📭 No events in the last {window}h.");
        return Ok(());
    }

    println!("📬 Events in the last {window}h ({}):", events.len());
    println!("{:-<72}", "");
    for event in &events {
        println!(
            "  {}  {:<28} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            serde_json::Value::Object(event.payload.clone())
        );
    }
    Ok(())
}
