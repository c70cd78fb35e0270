//! `palaver tools`: Show the tool schemas sent to the model.

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = palaver_tools::default_registry();

    println!("{} tools registered\n", registry.len());
    for def in registry.definitions() {
        println!("{}", def.name);
        println!("  {}", def.description);
        println!("{}\n", serde_json::to_string_pretty(&def.parameters)?);
    }

    Ok(())
}
