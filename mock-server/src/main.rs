use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mock_server=info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8001".to_string());
    let seeded = std::env::var("SEED").map(|v| v != "0").unwrap_or(true);
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, seeded, "listening");

    let db = if seeded {
        mock_server::seed::demo()
    } else {
        mock_server::Database::new()
    };
    mock_server::run_with(listener, db).await
}
