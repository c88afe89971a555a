use anyhow::Context;

use guildhall_infra::GuildhallConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    guildhall_observability::init();

    let config = GuildhallConfig::from_env().context("invalid configuration")?;
    let app = guildhall_api::app::build_app(&config).context("failed to build app")?;

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
