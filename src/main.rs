use std::sync::Arc;

use agent_commander::audit::AuditLog;
use agent_commander::config::CommanderConfig;
use agent_commander::crypto::ResultCipher;
use agent_commander::directory::WorkerDirectory;
use agent_commander::dispatch::Dispatcher;
use agent_commander::history::ConversationHistory;
use agent_commander::llm::{ChatModel, OpenAiChatModel};
use agent_commander::queue::TaskQueue;
use agent_commander::server::{AppState, commander_routes};
use agent_commander::store::CommanderDb;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CommanderConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export OPENAI_API_KEY=sk-...");
        std::process::exit(1);
    });

    let db = Arc::new(CommanderDb::open(&config.db_path).await?);
    let audit = Arc::new(AuditLog::new(Arc::clone(&db)));
    let history = Arc::new(ConversationHistory::new());
    let directory = Arc::new(WorkerDirectory::new());
    let queue = Arc::new(TaskQueue::new(
        Arc::clone(&db),
        Arc::clone(&audit),
        Arc::clone(&history),
    ));

    let llm: Arc<dyn ChatModel> =
        Arc::new(OpenAiChatModel::new(config.api_key.clone(), config.model.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&directory),
        Arc::clone(&queue),
        Arc::clone(&history),
        llm,
    ));

    let cipher = Arc::new(ResultCipher::from_config(&config.encryption)?);

    let state = AppState {
        directory: Arc::clone(&directory),
        queue,
        dispatcher,
        audit,
        cipher,
        upload_dir: config.upload_dir.clone(),
    };

    eprintln!("🎖️  Agent Commander v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Database: {}", config.db_path);
    eprintln!("   Listening on {}, token={}", config.bind_addr, directory.bearer_token());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, commander_routes(state)).await?;

    Ok(())
}
