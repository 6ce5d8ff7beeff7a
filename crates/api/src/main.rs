use anyhow::Context;

use stockledger_api::app::services::connector_for;
use stockledger_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockledger_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let connector = connector_for(&config.ledger).context("no usable ledger backend")?;

    let port = config.server.port;
    let app = stockledger_api::app::build_app(config, connector)
        .await
        .context("failed to initialize ledger session")?;

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
