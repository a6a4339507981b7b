use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let cfg = folio::server::ServerConfig::from_env()?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "folio",
        "folio starting: RUST_LOG='{}', http_port={}, data_root='{}', admin_email='{}', session_ttl_secs={}",
        rust_log, cfg.http_port, cfg.data_root, cfg.default_admin_email, cfg.session_ttl_secs
    );

    folio::server::run_with_config(cfg).await
}
