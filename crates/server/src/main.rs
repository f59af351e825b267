//! Streamly Server binary: `STREAMLY_SERVER__*` environment and `server.*`
//! file configuration only. The `streamly` binary also reads pipeline YAML.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    server::start_server(config).await
}
