use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    atrium_observability::init();

    let config = atrium_api::config::AppConfig::from_env();
    let bind_addr = config.bind_addr.clone();

    let app = atrium_api::app::build_app(config)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
