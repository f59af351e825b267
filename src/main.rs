//! `streamly` binary: the HTTP server plus an optional pipeline YAML file.

use server::ServerConfig;
use streamly::StreamlyConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = ServerConfig::load()?;

    if let Some(path) = config.pipeline_config.clone() {
        // Logging starts inside `start_server`, which reports the applied values.
        StreamlyConfig::from_file(&path)?.apply_to(&mut config);
    }

    server::start_server(config).await
}
