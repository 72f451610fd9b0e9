use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{client_ip, AppState};
use crate::auth::Caller;
use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;
use crate::repo::{CommunityRepo, FavoriteRepo, Outcome, ReportRepo, UserRepo};

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteState {
    pub favorited: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeState {
    pub liked: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportStatusChange {
    pub status: ReportStatus,
}

// ---------------- Favorites ----------------

#[utoipa::path(
    get,
    path = "/api/favorites",
    responses(
        (status = 200, description = "Caller's saved listings", body = [Favorite]),
        (status = 401, description = "Unauthorized", body = ApiErrorBody)
    )
)]
pub async fn list_favorites(caller: Caller, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let favs = data.repo.list_favorites(caller.uid()).await?;
    Ok(HttpResponse::Ok().json(favs))
}

#[utoipa::path(
    get,
    path = "/api/favorites/{listing_id}",
    params(("listing_id" = String, Path, description = "Listing id")),
    responses((status = 200, description = "Whether the caller saved the listing", body = FavoriteState))
)]
pub async fn favorite_status(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let favorited = data.repo.is_favorited(caller.uid(), &path).await?;
    Ok(HttpResponse::Ok().json(FavoriteState { favorited }))
}

#[utoipa::path(
    post,
    path = "/api/favorites/{listing_id}",
    params(("listing_id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "New saved state", body = FavoriteState),
        (status = 404, description = "Listing not found", body = ApiErrorBody)
    )
)]
pub async fn toggle_favorite(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let listing_id = path.into_inner();
    if data.listings.get_listing_by_id(&listing_id).await?.is_none() {
        return Err(ApiError::NotFound("Listing not found".into()));
    }
    let favorited = data.repo.toggle_favorite(caller.uid(), &listing_id).await?;
    Ok(HttpResponse::Ok().json(FavoriteState { favorited }))
}

// ---------------- Reports ----------------

#[utoipa::path(
    post,
    path = "/api/reports",
    request_body = NewReport,
    responses(
        (status = 201, description = "Report filed", body = Report),
        (status = 404, description = "Listing not found", body = ApiErrorBody),
        (status = 429, description = "Rate limited", body = ApiErrorBody)
    )
)]
pub async fn create_report(
    req: HttpRequest,
    caller: Option<Caller>,
    data: web::Data<AppState>,
    payload: web::Json<NewReport>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_report(&client_ip(&req, data.config.trust_proxy)) {
            return Err(ApiError::TooManyRequests);
        }
    }
    let mut new = payload.into_inner();
    new.reported_by = caller.map(|c| c.0.uid).unwrap_or_else(|| ANONYMOUS_REPORTER.to_string());
    if data.listings.get_listing_by_id(&new.listing_id).await?.is_none() {
        return Err(ApiError::NotFound("Listing not found".into()));
    }
    let report = data.repo.create_report(new).await?;
    Ok(HttpResponse::Created().json(report))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports",
    params(("status" = Option<String>, Query, description = "pending | reviewed | resolved | all (default)")),
    responses(
        (status = 200, description = "Reports, newest first", body = [Report]),
        (status = 403, description = "Moderator only", body = ApiErrorBody)
    )
)]
pub async fn admin_list_reports(
    caller: Caller,
    data: web::Data<AppState>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, ApiError> {
    data.gate.require_moderator(&caller.0).await?;
    let reports = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => data.repo.get_all_reports().await?,
        Some("pending") => data.repo.get_pending_reports().await?,
        Some(other) => {
            let status: ReportStatus = other.parse().map_err(ApiError::BadRequest)?;
            let mut all = data.repo.get_all_reports().await?;
            all.retain(|r| r.status == status);
            all
        }
    };
    Ok(HttpResponse::Ok().json(reports))
}

#[utoipa::path(
    post,
    path = "/api/admin/reports/{id}/status",
    params(("id" = String, Path, description = "Report id")),
    request_body = ReportStatusChange,
    responses(
        (status = 200, description = "Report updated", body = Report),
        (status = 202, description = "Store unavailable; nothing changed"),
        (status = 400, description = "Status may only move forward", body = ApiErrorBody),
        (status = 403, description = "Moderator only", body = ApiErrorBody),
        (status = 404, description = "Report not found", body = ApiErrorBody)
    )
)]
pub async fn admin_update_report(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ReportStatusChange>,
) -> Result<HttpResponse, ApiError> {
    data.gate.require_moderator(&caller.0).await?;
    match data.repo.update_report_status(&path, payload.status, caller.uid()).await? {
        Outcome::Done(report) => Ok(HttpResponse::Ok().json(report)),
        Outcome::BestEffort(reason) => Ok(HttpResponse::Accepted().json(serde_json::json!({
            "updated": false,
            "reason": reason,
        }))),
    }
}

// ---------------- Profile ----------------

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Caller's profile, created on first access", body = UserProfile),
        (status = 401, description = "Unauthorized", body = ApiErrorBody)
    )
)]
pub async fn get_me(caller: Caller, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.ensure_user(&caller.0).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    patch,
    path = "/api/me",
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Invalid or unknown field", body = ApiErrorBody)
    )
)]
pub async fn update_me(
    caller: Caller,
    data: web::Data<AppState>,
    payload: web::Json<ProfilePatch>,
) -> Result<HttpResponse, ApiError> {
    data.repo.ensure_user(&caller.0).await?;
    let profile = data.repo.update_profile(caller.uid(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

// ---------------- Community ----------------

#[utoipa::path(
    get,
    path = "/api/community/posts",
    responses((status = 200, description = "Posts, newest first", body = [CommunityPost]))
)]
pub async fn list_posts(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.list_posts().await?))
}

#[utoipa::path(
    post,
    path = "/api/community/posts",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = CommunityPost),
        (status = 400, description = "Empty content", body = ApiErrorBody)
    )
)]
pub async fn create_post(
    caller: Caller,
    data: web::Data<AppState>,
    payload: web::Json<NewPost>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.create_post(&caller.0, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/community/posts/{id}/comments",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments, oldest first", body = [CommunityComment]),
        (status = 404, description = "Post not found", body = ApiErrorBody)
    )
)]
pub async fn list_comments(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    if data.repo.get_post(&path).await?.is_none() {
        return Err(ApiError::NotFound("Post not found".into()));
    }
    Ok(HttpResponse::Ok().json(data.repo.list_comments(&path).await?))
}

#[utoipa::path(
    post,
    path = "/api/community/posts/{id}/comments",
    params(("id" = String, Path, description = "Post id")),
    request_body = NewComment,
    responses(
        (status = 201, description = "Comment added", body = CommunityComment),
        (status = 404, description = "Post not found", body = ApiErrorBody)
    )
)]
pub async fn add_comment(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<NewComment>,
) -> Result<HttpResponse, ApiError> {
    let comment = data.repo.add_comment(&path, &caller.0, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    post,
    path = "/api/community/posts/{id}/like",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "New like state", body = LikeState),
        (status = 404, description = "Post not found", body = ApiErrorBody)
    )
)]
pub async fn toggle_like(
    caller: Caller,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let liked = data.repo.toggle_like(caller.uid(), &path).await?;
    Ok(HttpResponse::Ok().json(LikeState { liked }))
}
