/// Address the session server listens on.
const BIND_ENV: &str = "TENANTKIT_BIND";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenantkit_observability::init();

    let addr = std::env::var(BIND_ENV).unwrap_or_else(|_| {
        tracing::warn!("{BIND_ENV} not set; using 0.0.0.0:8080");
        "0.0.0.0:8080".to_string()
    });

    let app = tenantkit_api::app::build_app(tenantkit_admin::registry());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
