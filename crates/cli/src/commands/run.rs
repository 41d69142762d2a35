//! `agentrelay run`: run one agent's workflow.

use agentrelay_orchestrator::RunOptions;

use super::CmdResult;

pub async fn run(
    agent_id: &str,
    dry_run: bool,
    force: bool,
    input: Option<&str>,
    emit_events: bool,
) -> CmdResult {
    let input = super::parse_payload(input, "--input")?;
    let orchestrator = super::open()?;

    println!("{}", "=".repeat(60));
    println!("🛰️  AgentRelay Agent Runner");
    println!("  Agent: {agent_id}");
    println!("  Time:  {}", chrono::Utc::now().to_rfc3339());
    println!("{}", "=".repeat(60));

    let options = RunOptions {
        force,
        dry_run,
        emit_events,
        input,
    };
    let outcome = orchestrator.run_agent(agent_id, options).await;

    // triggered urgent runs are detached; let them finish before exiting
    orchestrator.wait_idle().await;

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            println!("\n❌ Run failed: {e}");
            std::process::exit(1);
        }
    };

    if report.is_dry_run() {
        println!("\n[DRY RUN] Would execute:");
        println!("{}", serde_json::to_string_pretty(&report.agent.workflow)?);
        return Ok(());
    }

    let hot = report
        .result
        .as_ref()
        .map(|r| r.level_count("hot"))
        .unwrap_or(0);
    let output = report
        .result
        .as_ref()
        .and_then(|r| r.context.records.as_ref())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "none".into());

    println!("\n{}", "=".repeat(60));
    println!("EXECUTION SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Agent:        {}", report.agent.name);
    println!("Status:       {}", if report.summary.success { "✅ SUCCESS" } else { "❌ FAILED" });
    println!("Steps:        {}", report.summary.steps);
    println!("Duration:     {:.2}s", report.summary.duration_ms as f64 / 1000.0);
    println!("Output:       {output}");
    if hot > 0 {
        println!("Hot leads:    {hot} 🔥");
    }
    match &report.completion {
        Some(event) => println!("Event:        {}", event.event_type),
        None => println!("Event:        ⏸️  not emitted"),
    }
    println!("{}", "=".repeat(60));

    if !report.summary.success {
        std::process::exit(1);
    }
    Ok(())
}
