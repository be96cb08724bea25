use clap::Parser;
use prompt_iterator_server::{ServerConfig, config, init_observability, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init();
    init_observability();
    let config = ServerConfig::parse();
    serve(config).await?;
    Ok(())
}
