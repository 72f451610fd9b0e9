use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use oghep::identity::JwtIdentityProvider;
use oghep::openapi::ApiDoc;
use oghep::store::InMemStore;
use oghep::{config, AppConfig, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = AppConfig::from_env().context("invalid configuration")?;
    info!("Bootstrapping oghep server");
    info!(
        frontend = %cfg.frontend_url,
        admins = cfg.admin_emails.len(),
        seed = cfg.allow_seed,
        rate_limit = cfg.rate_limit_enabled,
        "configuration loaded"
    );
    match &cfg.data_dir {
        Some(dir) => info!(dir = %dir.display(), "document store persisted to disk"),
        None => warn!("DATA_DIR not set; document store is ephemeral"),
    }

    let store = Arc::new(InMemStore::from_config(cfg.data_dir.as_deref()));
    let identity = Arc::new(JwtIdentityProvider::new(cfg.jwt_secret.clone()).with_revocation_store(store.clone()));
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let bind_addr = cfg.bind_addr.clone();
    let frontend_url = cfg.frontend_url.clone();
    let security = SecurityHeaders::from_config(&cfg);
    let state = AppState::build(cfg, store, identity).with_metrics(metrics);
    let openapi = ApiDoc::openapi();

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            // local Vite dev server
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_origin(&frontend_url)
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!("Listening on http://{bind_addr}");
    server.run().await?;
    Ok(())
}
