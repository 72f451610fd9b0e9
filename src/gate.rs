//! Admin authorization gate and the privileged account operations behind it.
//!
//! Every privileged endpoint verifies the caller first and checks the stored role before the
//! request body is even parsed, so a non-admin always gets `403 Admin only` no matter what
//! it sent.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::AdminAllowlist;
use crate::error::ApiError;
use crate::identity::{Identity, IdentityError, IdentityProvider};
use crate::models::Role;
use crate::repo::{Outcome, Repo, RepoError, UserContentRepo, UserRepo};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub uid: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteUserRequest {
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoteResponse {
    pub is_admin: bool,
}

#[derive(Debug)]
pub struct DeletionReport {
    /// Deleted document count per collection.
    pub deleted: BTreeMap<String, usize>,
    pub auth_account: Outcome,
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}

fn required_uid(uid: Option<String>) -> Result<String, ApiError> {
    uid.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("uid is required".into()))
}

#[derive(Clone)]
pub struct AdminGate {
    repo: Arc<dyn Repo>,
    identity: Arc<dyn IdentityProvider>,
    allowlist: AdminAllowlist,
}

impl AdminGate {
    pub fn new(repo: Arc<dyn Repo>, identity: Arc<dyn IdentityProvider>, allowlist: AdminAllowlist) -> Self {
        Self { repo, identity, allowlist }
    }

    /// Stored role of `uid`; callers without a profile are plain users.
    pub async fn role_of(&self, uid: &str) -> Result<Role, ApiError> {
        Ok(self.repo.get_user(uid).await?.map(|p| p.role).unwrap_or_default())
    }

    pub async fn require_admin(&self, caller: &Identity) -> Result<(), ApiError> {
        if self.role_of(&caller.uid).await?.is_admin() {
            Ok(())
        } else {
            Err(ApiError::admin_only())
        }
    }

    pub async fn require_moderator(&self, caller: &Identity) -> Result<Role, ApiError> {
        let role = self.role_of(&caller.uid).await?;
        if role.is_moderator() {
            Ok(role)
        } else {
            Err(ApiError::moderator_only())
        }
    }

    /// Grant admin to an allowlisted caller. Anyone else gets `isAdmin: false` and nothing changes.
    pub async fn promote(&self, caller: &Identity) -> Result<PromoteResponse, ApiError> {
        let email = caller
            .email
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("No email on token".into()))?;
        if !self.allowlist.contains(email) {
            return Ok(PromoteResponse { is_admin: false });
        }
        self.repo.upsert_role(caller, Role::Admin).await?;
        info!(uid = %caller.uid, "promoted allowlisted caller to admin");
        Ok(PromoteResponse { is_admin: true })
    }

    pub async fn set_role(&self, caller: &Identity, body: &[u8]) -> Result<Role, ApiError> {
        self.require_admin(caller).await?;
        let req: SetRoleRequest = parse_body(body)?;
        let uid = required_uid(req.uid)?;
        let role = req
            .role
            .as_deref()
            .and_then(Role::parse_assignable)
            .ok_or_else(|| ApiError::BadRequest("role must be one of: user, mod, tester".into()))?;
        if uid == caller.uid {
            return Err(ApiError::BadRequest("Cannot change your own role".into()));
        }
        match self.repo.set_user_role(&uid, role).await {
            Ok(_) => {
                info!(admin = %caller.uid, target = %uid, role = role.as_str(), "role changed");
                Ok(role)
            }
            Err(RepoError::NotFound) => Err(ApiError::NotFound("User not found".into())),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_user(&self, caller: &Identity, body: &[u8]) -> Result<DeletionReport, ApiError> {
        self.require_admin(caller).await?;
        let req: DeleteUserRequest = parse_body(body)?;
        let uid = required_uid(req.uid)?;
        if uid == caller.uid {
            return Err(ApiError::BadRequest("Cannot delete yourself".into()));
        }
        let target = self
            .repo
            .get_user(&uid)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        if target.role.is_admin() {
            return Err(ApiError::BadRequest("Cannot delete an admin".into()));
        }

        let deleted = self.repo.purge_user_content(&uid).await?;
        self.repo.delete_user_profile(&uid).await?;
        let auth_account = match self.identity.delete_account(&uid).await {
            Ok(()) => Outcome::Done(()),
            Err(IdentityError::UserNotFound) => {
                info!(uid = %uid, "no identity account on record; tokens revoked");
                Outcome::BestEffort("identity account not found".into())
            }
            Err(e) => {
                warn!(uid = %uid, "identity account not deleted: {e}");
                Outcome::BestEffort(e.to_string())
            }
        };
        metrics::increment_counter!("users_deleted_total");
        info!(admin = %caller.uid, target = %uid, ?deleted, "user deleted");
        Ok(DeletionReport { deleted, auth_account })
    }
}
