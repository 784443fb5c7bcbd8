use std::sync::Arc;

use agent_commander::config::WorkerConfig;
use agent_commander::worker::skills::SkillSet;
use agent_commander::worker::skills::shell::ShellSkill;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export AGENT_SERVER=http://127.0.0.1:8000");
        eprintln!("  export AGENT_TOKEN=<commander bearer token>");
        std::process::exit(1);
    });

    let skills = Arc::new(SkillSet::new());
    skills.register(Arc::new(ShellSkill::new())).await;
    eprintln!("🛰️  Worker agent ({} skills)", skills.count().await);

    agent_commander::worker::run(config, skills).await?;
    Ok(())
}
