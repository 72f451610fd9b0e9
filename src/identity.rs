use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::repo::collections::REVOKED_SUBJECTS;
use crate::store::{Document, DocumentStore};

/// Verified caller identity as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into(), email: None, name: None, picture: None }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("user not found")]
    UserNotFound,
    #[error("identity provider error: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<Identity, IdentityError>;
    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// HS256 token issuer/verifier. Subjects seen through `issue_token`/`verify_token` are
/// tracked as accounts; deleting a subject revokes every token issued for it, whether or
/// not this process has seen it. With a revocation store the list outlives the process.
pub struct JwtIdentityProvider {
    secret: String,
    accounts: DashMap<String, DateTime<Utc>>,
    revoked: DashMap<String, DateTime<Utc>>,
    revocations: Option<Arc<dyn DocumentStore>>,
}

impl JwtIdentityProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into(), accounts: DashMap::new(), revoked: DashMap::new(), revocations: None }
    }

    /// Persist revoked subjects in `store` and consult it when verifying.
    pub fn with_revocation_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.revocations = Some(store);
        self
    }

    async fn is_revoked(&self, sub: &str) -> Result<bool, IdentityError> {
        if self.revoked.contains_key(sub) {
            return Ok(true);
        }
        let Some(store) = &self.revocations else { return Ok(false) };
        let found = store
            .get(REVOKED_SUBJECTS, sub)
            .await
            .map_err(|e| IdentityError::Upstream(e.to_string()))?;
        if found.is_some() {
            self.revoked.insert(sub.to_string(), Utc::now());
        }
        Ok(found.is_some())
    }

    pub fn issue_token(&self, identity: &Identity, ttl: Duration) -> Result<String, IdentityError> {
        let exp = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| IdentityError::Upstream("token lifetime overflow".into()))?
            .timestamp() as usize;
        let claims = Claims {
            sub: identity.uid.clone(),
            exp,
            email: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.picture.clone(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| IdentityError::Upstream(e.to_string()))?;
        self.accounts.entry(identity.uid.clone()).or_insert_with(Utc::now);
        Ok(token)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<Identity, IdentityError> {
        let claims = self.decode_claims(token)?;
        if self.is_revoked(&claims.sub).await? {
            return Err(IdentityError::InvalidToken("account deleted".into()));
        }
        self.accounts.entry(claims.sub.clone()).or_insert_with(Utc::now);
        Ok(Identity {
            uid: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
            name: claims.name,
            picture: claims.picture,
        })
    }

    /// Revokes `uid` unconditionally. `UserNotFound` only reports that no token for it was
    /// seen by this process; the subject is revoked either way.
    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let now = Utc::now();
        self.revoked.insert(uid.to_string(), now);
        if let Some(store) = &self.revocations {
            let mut doc = Document::new();
            doc.insert("uid".into(), Value::from(uid));
            doc.insert("revokedAt".into(), Value::from(now.to_rfc3339_opts(SecondsFormat::AutoSi, true)));
            store
                .set(REVOKED_SUBJECTS, uid, doc)
                .await
                .map_err(|e| IdentityError::Upstream(format!("revocation not persisted: {e}")))?;
        }
        info!(uid, "subject revoked");
        match self.accounts.remove(uid) {
            Some(_) => Ok(()),
            None => Err(IdentityError::UserNotFound),
        }
    }
}
