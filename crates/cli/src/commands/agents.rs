//! `agentrelay agents`: list installed agents.

use agentrelay_config::AgentLoader;

use super::CmdResult;

pub async fn run() -> CmdResult {
    let config = super::load_config()?;
    let agents = AgentLoader::new(config.paths.agents_dir.clone()).list();

    if agents.is_empty() {
        println!("📋 No agents found in {}", config.paths.agents_dir.display());
        return Ok(());
    }

    println!("📋 Agents ({}):", agents.len());
    println!("{:-<72}", "");
    for agent in &agents {
        let status = if agent.enabled { "✅" } else { "⏸️ " };
        println!("  {status} {:<16} {:<28} {}", agent.id, agent.name, agent.schedule);
    }
    Ok(())
}
