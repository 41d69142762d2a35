//! `agentrelay process`: dispatch the top of today's backlog.

use super::CmdResult;

pub async fn run() -> CmdResult {
    let orchestrator = super::open()?;
    let report = orchestrator.process_scheduled().await;

    for invocation in &report.dispatched {
        println!("  ▶ {:<16} {:<8} {}", invocation.agent_id, invocation.priority, invocation.id);
    }
    orchestrator.wait_idle().await;

    println!(
        "Processed {} scheduled agents ({} dispatched)",
        report.pending,
        report.dispatched.len()
    );
    Ok(())
}
