use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use crate::config::{AppConfig, ListingSourceKind};
use crate::error::ApiError;
use crate::gate::AdminGate;
use crate::identity::{Identity, IdentityProvider};
use crate::models::{Actor, Listing, Role};
use crate::rate_limit::RateLimiter;
use crate::repo::{FixtureListingSource, ListingSource, Repo, StoreListingSource, StoreRepo};
use crate::store::DocumentStore;

pub mod admin;
pub mod listings;
pub mod social;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()));

    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/listings")
                    .route(web::get().to(listings::list_listings))
                    .route(web::post().to(listings::create_listing)),
            )
            .service(
                web::resource("/listings/{id}")
                    .route(web::get().to(listings::get_listing))
                    .route(web::patch().to(listings::update_listing))
                    .route(web::delete().to(listings::delete_listing)),
            )
            .service(web::resource("/listings/{id}/status").route(web::post().to(listings::change_listing_status)))
            .service(web::resource("/listings/{id}/view").route(web::post().to(listings::record_view)))
            .service(web::resource("/users/{uid}/listings").route(web::get().to(listings::user_listings)))
            .service(web::resource("/seed").route(web::post().to(listings::seed)))
            .service(web::resource("/favorites").route(web::get().to(social::list_favorites)))
            .service(
                web::resource("/favorites/{listing_id}")
                    .route(web::get().to(social::favorite_status))
                    .route(web::post().to(social::toggle_favorite)),
            )
            .service(web::resource("/reports").route(web::post().to(social::create_report)))
            .service(
                web::resource("/me")
                    .route(web::get().to(social::get_me))
                    .route(web::patch().to(social::update_me)),
            )
            .service(
                web::resource("/community/posts")
                    .route(web::get().to(social::list_posts))
                    .route(web::post().to(social::create_post)),
            )
            .service(
                web::resource("/community/posts/{id}/comments")
                    .route(web::get().to(social::list_comments))
                    .route(web::post().to(social::add_comment)),
            )
            .service(web::resource("/community/posts/{id}/like").route(web::post().to(social::toggle_like)))
            // Privileged endpoints
            .service(web::resource("/auth/promote").route(web::post().to(admin::promote)))
            .service(web::resource("/admin/set-role").route(web::post().to(admin::set_role)))
            .service(web::resource("/admin/delete-user").route(web::post().to(admin::delete_user)))
            .service(web::resource("/admin/listings/{id}").route(web::delete().to(listings::admin_hard_delete)))
            .service(web::resource("/admin/reports").route(web::get().to(social::admin_list_reports)))
            .service(web::resource("/admin/reports/{id}/status").route(web::post().to(social::admin_update_report))),
    );
    cfg.route("/healthz", web::get().to(healthz));
    cfg.route("/metrics", web::get().to(render_metrics));
}

#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<dyn ListingSource>,
    pub repo: Arc<dyn Repo>,
    pub identity: Arc<dyn IdentityProvider>,
    pub gate: AdminGate,
    pub config: Arc<AppConfig>,
    pub rate_limiter: Option<RateLimiter>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire repositories, the admin gate and rate limiting from configuration.
    pub fn build(config: AppConfig, store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let listings: Arc<dyn ListingSource> = match config.listing_source {
            ListingSourceKind::Store => Arc::new(StoreListingSource::new(store.clone(), config.initial_listing_status)),
            ListingSourceKind::Fixture => Arc::new(FixtureListingSource::with_samples(config.initial_listing_status)),
        };
        info!(source = ?config.listing_source, initial_status = %config.initial_listing_status, "listing source ready");
        let repo: Arc<dyn Repo> = Arc::new(StoreRepo::new(store));
        let gate = AdminGate::new(repo.clone(), identity.clone(), config.admin_emails.clone());
        let rate_limiter = config.rate_limit_enabled.then(|| RateLimiter::new(config.rate_limits.clone()));
        Self {
            listings,
            repo,
            identity,
            gate,
            config: Arc::new(config),
            rate_limiter,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Role of an optional caller; anonymous visitors count as plain users.
    pub(crate) async fn role_of(&self, caller: Option<&Identity>) -> Result<Role, ApiError> {
        match caller {
            Some(c) => self.gate.role_of(&c.uid).await,
            None => Ok(Role::User),
        }
    }

    /// How the caller may act on `listing`, if at all. Moderators outrank ownership.
    pub(crate) async fn actor_for(&self, caller: &Identity, listing: &Listing) -> Result<Option<Actor>, ApiError> {
        if self.gate.role_of(&caller.uid).await?.is_moderator() {
            Ok(Some(Actor::Moderator))
        } else if listing.is_owned_by(&caller.uid) {
            Ok(Some(Actor::Owner))
        } else {
            Ok(None)
        }
    }
}

/// Client address used to key per-client limits. Forwarding headers are client-controlled,
/// so they are honoured only when the server sits behind a trusted proxy.
pub(crate) fn client_ip(req: &HttpRequest, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = req.connection_info().realip_remote_addr() {
            return ip.to_string();
        }
    }
    req.peer_addr().map(|a| a.ip().to_string()).unwrap_or_else(|| "unknown".into())
}

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Service is up")))]
pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

pub async fn render_metrics(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let handle = data.metrics.as_ref().ok_or_else(|| ApiError::NotFound("Not found".into()))?;
    Ok(HttpResponse::Ok().content_type("text/plain; version=0.0.4").body(handle.render()))
}
