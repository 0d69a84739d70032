use pairlink::config::RelayConfig;
use pairlink::relay::RelayServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = RelayConfig::from_env();

    println!("   Pairlink Signaling Relay");
    println!("   Binding to {}", config.listen_addr);
    println!("   Press Ctrl+C to stop\n");

    let server = RelayServer::bind(&config).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
