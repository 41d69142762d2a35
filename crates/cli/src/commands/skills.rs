//! `agentrelay skills`: list or show skills.

use super::CmdResult;

pub async fn list() -> CmdResult {
    let orchestrator = super::open()?;
    let skills = orchestrator.skills();
    let names = skills.list_available().await;

    if names.is_empty() {
        println!("📚 No skills found in {}", skills.root().display());
        return Ok(());
    }

    println!("📚 Skills ({}):", names.len());
    for name in &names {
        let skill = skills.get(name).await;
        let description = skill.meta.get("description").map(String::as_str).unwrap_or("");
        let mark = if skill.loaded { "✅" } else { "❌" };
        println!("  {mark} {name:<24} {description}");
    }
    Ok(())
}

pub async fn show(name: &str) -> CmdResult {
    let orchestrator = super::open()?;
    let skill = orchestrator.skills().get(name).await;

    if !skill.loaded {
        let reason = skill.error.as_deref().unwrap_or("unknown error");
        println!("❌ Skill '{name}' could not be loaded: {reason}");
        std::process::exit(1);
    }

    println!("📚 {}", skill.name);
    if let Some(path) = &skill.path {
        println!("  Path: {}", path.display());
    }
    for (key, value) in &skill.meta {
        println!("  {key}: {value}");
    }
    println!("{:-<72}", "");
    println!("{}", skill.body.as_deref().unwrap_or_default());
    Ok(())
}
