use imgserver_api::setup::{initialize_app, server::start_server};
use imgserver_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router) = initialize_app(config.clone()).await?;

    start_server(&config, router).await?;

    Ok(())
}
