mod telemetry;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err).context("reading .env");
        }
    }

    tracing_subscriber::registry()
        .with(telemetry::env_filter())
        .with(telemetry::layer())
        .try_init()
        .context("installing tracing subscriber")?;

    let settings = api::Settings::from_env().context("loading configuration")?;
    info!(?settings, "configuration loaded");

    api::start(settings).await.context("running webhook server")?;

    Ok(())
}
