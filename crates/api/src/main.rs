use anyhow::Context;

use evax_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    evax_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = evax_api::app::build_app(&config).await?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
