//! `agentrelay init`: create the config file and working directories.

use agentrelay_config::AppConfig;

use super::CmdResult;

pub async fn run() -> CmdResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🛰️  AgentRelay Setup");
    println!("===================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete it and re-run init.");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = super::load_config()?;
    for (label, dir) in [
        ("agents", &config.paths.agents_dir),
        ("skills", &config.paths.skills_dir),
        ("data", &config.paths.data_dir),
    ] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created {label} directory: {}", dir.display());
        }
    }

    println!("\n📝 Next steps:");
    println!("   1. Add an agent at {}/<id>/agent.json", config.paths.agents_dir.display());
    println!("   2. Run it: agentrelay run <id> --dry-run");
    Ok(())
}
