use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Tasks available to a manually started server: `(task_id, list_id)`.
const SEED_TASKS: &[(u64, u64)] = &[(1, 1), (2, 1), (3, 2)];

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, tasks = SEED_TASKS.len(), "listening");
    mock_server::serve(listener, mock_server::app_with_tasks(SEED_TASKS)).await
}
