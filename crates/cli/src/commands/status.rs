//! `agentrelay status`: show system status.

use agentrelay_config::AppConfig;

use super::CmdResult;

pub async fn run() -> CmdResult {
    let orchestrator = super::open()?;
    let config = orchestrator.config();
    let status = orchestrator.status().await;

    println!("🛰️  AgentRelay Status");
    println!("====================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Data dir:     {}", config.paths.data_dir.display());
    let enabled = status.agents.iter().filter(|a| a.enabled).count();
    println!("  Agents:       {} ({enabled} enabled)", status.agents.len());
    println!("  Skills:       {}", status.skills.len());
    println!("  Triggers:     {}", status.triggers);
    println!("  Drain limit:  {}", config.scheduler.drain_limit);
    println!();
    println!("  Backlog today:");
    println!(
        "    pending {}  running {}  done {}  failed {}",
        status.pending, status.running, status.done, status.failed
    );
    println!(
        "  Runs today:   {} ok, {} failed",
        status.runs_today, status.failures_today
    );
    println!(
        "  Events ({}h):  {}",
        config.events.default_window_hours, status.recent_events
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, run `agentrelay init` first");
    }
    Ok(())
}
