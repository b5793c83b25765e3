use github_provider::{GitHubProvider, server::serve_stdio};
use tracing_subscriber::EnvFilter;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("GITHUB_PROVIDER_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let provider = GitHubProvider::new();
    serve_stdio(&provider).await?;
    Ok(())
}
