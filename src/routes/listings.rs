use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::AppState;
use crate::auth::Caller;
use crate::error::{ApiError, ApiErrorBody};
use crate::fixtures::seed_listings;
use crate::models::*;
use crate::repo::RepoError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: ListingStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeedResponse {
    pub success: bool,
    pub message: String,
    pub ids: Vec<String>,
}

fn parse_category(raw: Option<&str>) -> Result<Option<Category>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map(Some).map_err(ApiError::BadRequest),
        None => Ok(None),
    }
}

async fn load(data: &AppState, id: &str) -> Result<Listing, ApiError> {
    data.listings
        .get_listing_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Listing not found".into()))
}

/// Listings a caller may read: active for everyone, the rest only for owners and moderators.
async fn visible_to(data: &AppState, caller: Option<&Caller>, listing: &Listing) -> Result<bool, ApiError> {
    if listing.is_public() {
        return Ok(true);
    }
    match caller {
        Some(c) => Ok(data.actor_for(&c.0, listing).await?.is_some()),
        None => Ok(false),
    }
}

#[utoipa::path(
    get,
    path = "/api/listings",
    params(
        ("category" = Option<String>, Query, description = "roommate | roomshare | short-term | sublease"),
        ("status" = Option<String>, Query, description = "Moderators only: filter by status")
    ),
    responses(
        (status = 200, description = "Listings, newest first", body = [Listing]),
        (status = 400, description = "Unknown category or status", body = ApiErrorBody)
    )
)]
pub async fn list_listings(
    caller: Option<Caller>,
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let category = parse_category(query.category.as_deref())?;
    let mut listings = match category {
        Some(c) => data.listings.get_listings_by_category(c).await?,
        None => data.listings.get_listings().await?,
    };
    let is_moderator = data.role_of(caller.as_ref().map(|c| &c.0)).await?.is_moderator();
    let wanted: Option<ListingStatus> = match (&query.status, is_moderator) {
        (Some(s), true) => Some(s.parse().map_err(ApiError::BadRequest)?),
        _ => None,
    };
    listings.retain(|l| match wanted {
        Some(s) => l.status == s,
        None if is_moderator => l.status != ListingStatus::Deleted,
        None => l.is_public(),
    });
    Ok(HttpResponse::Ok().json(listings))
}

#[utoipa::path(
    post,
    path = "/api/listings",
    request_body = NewListing,
    responses(
        (status = 201, description = "Listing created", body = Listing),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 409, description = "Listing id already taken", body = ApiErrorBody),
        (status = 429, description = "Rate limited", body = ApiErrorBody)
    )
)]
pub async fn create_listing(
    caller: Caller,
    data: web::Data<AppState>,
    payload: web::Json<NewListing>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_listing(caller.uid()) {
            return Err(ApiError::TooManyRequests);
        }
    }
    let mut new = payload.into_inner();
    new.user_id = Some(caller.uid().to_string());
    new.status = None;
    let listing = data.listings.create_listing(new).await?;
    Ok(HttpResponse::Created().json(listing))
}

#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing", body = Listing),
        (status = 404, description = "Not found or not visible to the caller", body = ApiErrorBody)
    )
)]
pub async fn get_listing(
    caller: Option<Caller>,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let listing = load(&data, &path).await?;
    if !visible_to(&data, caller.as_ref(), &listing).await? {
        return Err(ApiError::NotFound("Listing not found".into()));
    }
    Ok(HttpResponse::Ok().json(listing))
}

#[utoipa::path(
    patch,
    path = "/api/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    request_body = ListingPatch,
    responses(
        (status = 200, description = "Listing updated", body = Listing),
        (status = 403, description = "Not the owner", body = ApiErrorBody),
        (status = 404, description = "Not found", body = ApiErrorBody)
    )
)]
pub async fn update_listing(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ListingPatch>,
) -> Result<HttpResponse, ApiError> {
    let listing = load(&data, &path).await?;
    let actor = data
        .actor_for(&caller.0, &listing)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not the listing owner".into()))?;
    // a soft-deleted listing is gone for its owner; only moderators may still touch it
    if actor == Actor::Owner && listing.status == ListingStatus::Deleted {
        return Err(ApiError::NotFound("Listing not found".into()));
    }
    let mut patch = payload.into_inner();
    // status only moves through the status endpoint; an owner edit resubmits a rejected listing
    patch.status = match (actor, listing.status) {
        (Actor::Owner, ListingStatus::Rejected) => Some(ListingStatus::Pending),
        _ => None,
    };
    let updated = data.listings.update_listing(&listing.id, patch).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Listing soft-deleted"),
        (status = 403, description = "Not the owner", body = ApiErrorBody),
        (status = 404, description = "Not found", body = ApiErrorBody)
    )
)]
pub async fn delete_listing(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let listing = load(&data, &path).await?;
    let actor = data
        .actor_for(&caller.0, &listing)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not the listing owner".into()))?;
    data.listings.transition_status(&listing.id, ListingStatus::Deleted, actor).await?;
    info!(id = %listing.id, by = %caller.uid(), "listing deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/listings/{id}/status",
    params(("id" = String, Path, description = "Listing id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed", body = Listing),
        (status = 400, description = "Transition not allowed", body = ApiErrorBody),
        (status = 403, description = "Not the owner or a moderator", body = ApiErrorBody),
        (status = 404, description = "Not found", body = ApiErrorBody)
    )
)]
pub async fn change_listing_status(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<StatusChange>,
) -> Result<HttpResponse, ApiError> {
    let listing = load(&data, &path).await?;
    let actor = data
        .actor_for(&caller.0, &listing)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not the listing owner".into()))?;
    let updated = data.listings.transition_status(&listing.id, payload.status, actor).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    post,
    path = "/api/listings/{id}/view",
    params(("id" = String, Path, description = "Listing id")),
    responses((status = 204, description = "Recorded when possible"))
)]
pub async fn record_view(
    caller: Option<Caller>,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();
    match data.listings.get_listing_by_id(&id).await {
        Ok(Some(listing)) => {
            if matches!(visible_to(&data, caller.as_ref(), &listing).await, Ok(true)) {
                data.listings.increment_view_count(&id).await;
            }
        }
        Ok(None) => {}
        Err(e) => warn!(id = %id, "view not recorded: {e}"),
    }
    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    delete,
    path = "/api/admin/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Listing removed permanently"),
        (status = 403, description = "Admin only", body = ApiErrorBody),
        (status = 404, description = "Not found", body = ApiErrorBody)
    )
)]
pub async fn admin_hard_delete(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.gate.require_admin(&caller.0).await?;
    match data.listings.hard_delete_listing(&path).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(RepoError::NotFound) => Err(ApiError::NotFound("Listing not found".into())),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/users/{uid}/listings",
    params(("uid" = String, Path, description = "Owner uid")),
    responses((status = 200, description = "Listings of one user", body = [Listing]))
)]
pub async fn user_listings(
    caller: Option<Caller>,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let uid = path.into_inner();
    let mut listings = data.listings.get_listings_by_user_id(&uid).await?;
    let is_owner = caller.as_ref().is_some_and(|c| c.uid() == uid);
    let is_moderator = data.role_of(caller.as_ref().map(|c| &c.0)).await?.is_moderator();
    listings.retain(|l| {
        if is_moderator {
            true
        } else if is_owner {
            l.status != ListingStatus::Deleted
        } else {
            l.is_public()
        }
    });
    Ok(HttpResponse::Ok().json(listings))
}

#[utoipa::path(
    post,
    path = "/api/seed",
    responses(
        (status = 200, description = "Sample listings present", body = SeedResponse),
        (status = 404, description = "Seeding disabled", body = ApiErrorBody),
        (status = 500, description = "Store error", body = ApiErrorBody)
    )
)]
pub async fn seed(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    if !data.config.allow_seed {
        return Err(ApiError::NotFound("Not found".into()));
    }
    let mut ids = Vec::new();
    let mut created = 0usize;
    for new in seed_listings() {
        let Some(id) = new.id.clone() else { continue };
        if data.listings.get_listing_by_id(&id).await?.is_none() {
            data.listings.create_listing(new).await?;
            created += 1;
        }
        ids.push(id);
    }
    info!(created, total = ids.len(), "seed complete");
    Ok(HttpResponse::Ok().json(SeedResponse {
        success: true,
        message: format!("Seeded {created} listings ({} already present)", ids.len() - created),
        ids,
    }))
}
