//! `palaver onboard`: First-time setup.

use palaver_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_path();

    println!("Palaver: First-Time Setup");
    println!("==========================\n");

    if AppConfig::write_default(&config_path)? {
        println!("Created config.toml at: {}", config_path.display());
    } else {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    let config = AppConfig::default();
    println!("\nNext steps:");
    println!("  1. Start Ollama and pull the model:  ollama pull {}", config.provider.model);
    println!("  2. Start the memory service at {}", config.memory.base_url);
    println!("     (or set [memory] backend = \"in_memory\" or \"none\")");
    println!("  3. Run: palaver chat");
    println!();

    Ok(())
}
