//! `palaver chat`: Interactive or single-message chat mode.

use palaver_agent::{Session, TurnEngine, TurnEvent, TurnOutcome};
use palaver_config::AppConfig;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub async fn run(
    message: Option<String>,
    session: Option<String>,
    model: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(session) = session {
        config.conversation.session_id = session;
    }
    if let Some(model) = model {
        config.provider.model = model;
    }
    config.validate()?;

    let mut engine = build_engine(&config)?;
    engine
        .session()
        .register(Duration::from_secs(config.memory.timeout_secs))
        .await;

    if let Some(msg) = message {
        // Single message mode
        let outcome = stream_turn(&mut engine, msg.trim()).await?;
        report_exhaustion(&outcome);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Palaver: interactive mode");
    println!();
    println!("  Model:     {}", config.provider.model);
    println!("  Provider:  {} ({})", config.provider.kind, config.provider.base_url);
    println!("  Memory:    {} (session '{}')", config.memory.backend, config.conversation.session_id);
    println!("  Tools:     {}", engine.session().tools.names().join(", "));
    println!();
    println!("  Type your message and press Enter. Type 'exit' to quit.");
    println!();

    match engine.session().provider.health_check().await {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            eprintln!("  [Warning] {} is not reachable; turns will fail until it is.", config.provider.base_url);
            eprintln!();
        }
    }

    let mut lines = spawn_line_reader();
    prompt()?;

    while let Some(line) = lines.recv().await {
        match stream_turn(&mut engine, &line).await {
            Ok(outcome) => report_exhaustion(&outcome),
            Err(e) => eprintln!("  [Error] {e}"),
        }
        println!();
        prompt()?;
    }

    println!();
    Ok(())
}

/// Assemble the session and engine described by `config`.
pub fn build_engine(config: &AppConfig) -> Result<TurnEngine, Box<dyn std::error::Error>> {
    let provider = palaver_providers::from_config(&config.provider)?;
    let memory = palaver_memory::from_config(&config.memory)?;
    let tools = Arc::new(palaver_tools::default_registry());

    let session = Session::new(
        config.conversation.session_id.clone(),
        provider,
        tools,
        memory,
        config.provider.model.clone(),
    )
    .with_temperature(config.provider.temperature);

    Ok(TurnEngine::from_config(session, config)?)
}

/// Resolve one turn while printing its text as it streams in.
async fn stream_turn(engine: &mut TurnEngine, text: &str) -> Result<TurnOutcome, palaver_core::Error> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    // The sender moves into the resolving future so the printer ends with it
    let resolve = async move { engine.resolve_streaming(text, &tx).await };
    let print = async {
        while let Some(event) = rx.recv().await {
            render(event);
        }
    };

    let (outcome, ()) = tokio::join!(resolve, print);
    outcome
}

fn render(event: TurnEvent) {
    match event {
        TurnEvent::Chunk { content } => {
            print!("{content}");
            let _ = std::io::stdout().flush();
        }
        TurnEvent::ToolCall { name, arguments, .. } => {
            eprintln!("  [tool] {name} {}", serde_json::Value::Object(arguments));
        }
        TurnEvent::ToolResult {
            name,
            output,
            success: false,
            ..
        } => {
            eprintln!("  [tool] {name} failed: {output}");
        }
        TurnEvent::Done { .. } => println!(),
        TurnEvent::ToolResult { .. } | TurnEvent::RoundCompleted { .. } => {}
    }
}

fn report_exhaustion(outcome: &TurnOutcome) {
    if outcome.exhausted {
        eprintln!(
            "  [Notice] stopped after {} rounds without a final answer",
            outcome.rounds
        );
    }
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

/// Read stdin line by line on a background task.
///
/// Blank lines are skipped; a line reading `exit` ends the stream.
fn spawn_line_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if line == "exit" {
                        break;
                    }
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });

    rx
}
