use actix_web::{web, HttpResponse};

use super::AppState;
use crate::auth::Caller;
use crate::error::{ApiError, ApiErrorBody};
use crate::gate::{DeleteUserRequest, PromoteResponse, SetRoleRequest};

#[utoipa::path(
    post,
    path = "/api/auth/promote",
    responses(
        (status = 200, description = "Whether the caller is now an admin", body = PromoteResponse),
        (status = 400, description = "Token carries no email", body = ApiErrorBody),
        (status = 401, description = "Missing or invalid token", body = ApiErrorBody)
    )
)]
pub async fn promote(caller: Caller, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let res = data.gate.promote(&caller.0).await?;
    Ok(HttpResponse::Ok().json(res))
}

// Bodies are taken as raw bytes: the gate parses them only once the caller is known to be admin.

#[utoipa::path(
    post,
    path = "/api/admin/set-role",
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role updated"),
        (status = 400, description = "Invalid body, role or self-target", body = ApiErrorBody),
        (status = 403, description = "Admin only", body = ApiErrorBody),
        (status = 404, description = "User not found", body = ApiErrorBody)
    )
)]
pub async fn set_role(caller: Caller, data: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    data.gate.set_role(&caller.0, &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

#[utoipa::path(
    post,
    path = "/api/admin/delete-user",
    request_body = DeleteUserRequest,
    responses(
        (status = 200, description = "User and owned content removed"),
        (status = 400, description = "Invalid body, self-target or admin target", body = ApiErrorBody),
        (status = 403, description = "Admin only", body = ApiErrorBody),
        (status = 404, description = "User not found", body = ApiErrorBody)
    )
)]
pub async fn delete_user(caller: Caller, data: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let report = data.gate.delete_user(&caller.0, &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "deleted": report.deleted,
        "authAccountDeleted": report.auth_account.is_done(),
    })))
}
