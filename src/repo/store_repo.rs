use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::future::try_join_all;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::collections::*;
use super::*;
use crate::identity::Identity;
use crate::store::{Document, DocumentStore, StoreError, WriteBatch, WriteOp};

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::from(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Favorites, reports, profiles, community content and user purges over a [`DocumentStore`].
#[derive(Clone)]
pub struct StoreRepo {
    store: Arc<dyn DocumentStore>,
}

impl StoreRepo {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Counter adjustments on parent documents never fail the triggering write.
    async fn bump(&self, collection: &str, id: &str, field: &str, by: i64) {
        if let Err(e) = self.store.increment(collection, id, field, by).await {
            warn!(collection, id, field, "counter not adjusted: {e}");
        }
    }

    async fn owned_ids(&self, uid: &str) -> RepoResult<Vec<(&'static str, Vec<String>)>> {
        let mut out = Vec::with_capacity(USER_OWNED.len());
        for (collection, field) in USER_OWNED {
            let docs = self.store.find_eq(collection, field, &Value::from(uid)).await?;
            out.push((collection, docs.into_iter().map(|(id, _)| id).collect()));
        }
        Ok(out)
    }
}

// ---------------- Favorites ----------------

#[async_trait]
impl FavoriteRepo for StoreRepo {
    async fn is_favorited(&self, user_id: &str, listing_id: &str) -> RepoResult<bool> {
        Ok(self.store.get(FAVORITES, &favorite_key(user_id, listing_id)).await?.is_some())
    }

    async fn toggle_favorite(&self, user_id: &str, listing_id: &str) -> RepoResult<bool> {
        let key = favorite_key(user_id, listing_id);
        let now_favorited = if self.store.delete(FAVORITES, &key).await? {
            self.bump(LISTINGS, listing_id, "favoriteCount", -1).await;
            false
        } else {
            let fav = Favorite {
                user_id: user_id.to_string(),
                listing_id: listing_id.to_string(),
                created_at: Utc::now(),
            };
            self.store.set(FAVORITES, &key, encode(&fav)?).await?;
            self.bump(LISTINGS, listing_id, "favoriteCount", 1).await;
            true
        };
        metrics::increment_counter!("favorite_toggles_total", "saved" => if now_favorited { "true" } else { "false" });
        Ok(now_favorited)
    }

    async fn list_favorites(&self, user_id: &str) -> RepoResult<Vec<Favorite>> {
        let docs = self.store.find_eq(FAVORITES, "userId", &Value::from(user_id)).await?;
        let mut favs: Vec<Favorite> = decode_all(FAVORITES, docs, |id, d| decode(FAVORITES, id, d));
        favs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(favs)
    }
}

// ---------------- Reports ----------------

fn decode_reports(docs: Vec<(String, Document)>) -> Vec<Report> {
    let mut reports: Vec<Report> = decode_all(REPORTS, docs, |id, d| decode(REPORTS, id, d));
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    reports
}

#[async_trait]
impl ReportRepo for StoreRepo {
    async fn create_report(&self, new: NewReport) -> RepoResult<Report> {
        if new.listing_id.trim().is_empty() {
            return Err(RepoError::Invalid("listingId is required".into()));
        }
        let report = Report {
            id: Uuid::new_v4().to_string(),
            listing_id: new.listing_id,
            reported_by: new.reported_by,
            reason: new.reason,
            details: new.details.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            status: ReportStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };
        self.store.create(REPORTS, &report.id, encode(&report)?).await?;
        metrics::increment_counter!("reports_created_total");
        info!(id = %report.id, listing = %report.listing_id, "report filed");
        Ok(report)
    }

    async fn get_pending_reports(&self) -> RepoResult<Vec<Report>> {
        let docs = self.store.find_eq(REPORTS, "status", &Value::from(ReportStatus::Pending.as_str())).await?;
        Ok(decode_reports(docs))
    }

    async fn get_all_reports(&self) -> RepoResult<Vec<Report>> {
        Ok(decode_reports(self.store.list(REPORTS).await?))
    }

    async fn update_report_status(&self, id: &str, status: ReportStatus, reviewed_by: &str) -> RepoResult<Outcome<Report>> {
        let doc = match self.store.get(REPORTS, id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return Err(RepoError::NotFound),
            Err(StoreError::Unavailable(reason)) => {
                warn!(id, "report status not updated: {reason}");
                return Ok(Outcome::BestEffort(reason));
            }
            Err(e) => return Err(e.into()),
        };
        let mut report: Report = decode(REPORTS, id, doc)?;
        if !report.status.can_advance_to(status) {
            return Err(RepoError::InvalidTransition {
                from: report.status.to_string(),
                to: status.to_string(),
            });
        }

        report.status = status;
        report.reviewed_by = Some(reviewed_by.to_string());
        report.reviewed_at = Some(Utc::now());
        let mut changes = encode(&report)?;
        changes.retain(|k, _| matches!(k.as_str(), "status" | "reviewedBy" | "reviewedAt"));
        match self.store.merge(REPORTS, id, changes).await {
            Ok(_) => {
                info!(id, %status, reviewed_by, "report reviewed");
                Ok(Outcome::Done(report))
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!(id, "report status not updated: {reason}");
                Ok(Outcome::BestEffort(reason))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------- Users ----------------

fn profile_from(identity: &Identity, role: Role) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        uid: identity.uid.clone(),
        email: identity.email.clone(),
        display_name: identity.name.clone(),
        photo_url: identity.picture.clone(),
        role,
        gender: None,
        birth_year: None,
        occupation: None,
        lifestyle: None,
        created_at: now,
        updated_at: now,
    }
}

impl StoreRepo {
    async fn set_role_fields(&self, uid: &str, role: Role) -> RepoResult<UserProfile> {
        let mut changes = Document::new();
        changes.insert("role".into(), Value::from(role.as_str()));
        changes.insert("updatedAt".into(), timestamp(Utc::now()));
        let merged = self.store.merge(USERS, uid, changes).await?;
        decode(USERS, uid, merged)
    }
}

#[async_trait]
impl UserRepo for StoreRepo {
    async fn get_user(&self, uid: &str) -> RepoResult<Option<UserProfile>> {
        match self.store.get(USERS, uid).await? {
            Some(doc) => decode(USERS, uid, doc).map(Some),
            None => Ok(None),
        }
    }

    async fn ensure_user(&self, identity: &Identity) -> RepoResult<UserProfile> {
        if let Some(existing) = self.get_user(&identity.uid).await? {
            return Ok(existing);
        }
        let profile = profile_from(identity, Role::User);
        match self.store.create(USERS, &profile.uid, encode(&profile)?).await {
            Ok(()) => {
                info!(uid = %profile.uid, "user profile created");
                Ok(profile)
            }
            // lost a race with a concurrent first request
            Err(StoreError::AlreadyExists) => self.get_user(&identity.uid).await?.ok_or(RepoError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_role(&self, identity: &Identity, role: Role) -> RepoResult<UserProfile> {
        match self.set_role_fields(&identity.uid, role).await {
            Err(RepoError::NotFound) => {
                let profile = profile_from(identity, role);
                self.store.set(USERS, &profile.uid, encode(&profile)?).await?;
                Ok(profile)
            }
            other => other,
        }
    }

    async fn set_user_role(&self, uid: &str, role: Role) -> RepoResult<UserProfile> {
        self.set_role_fields(uid, role).await
    }

    async fn update_profile(&self, uid: &str, patch: ProfilePatch) -> RepoResult<UserProfile> {
        patch.validate().map_err(RepoError::Invalid)?;
        let mut changes = encode(&patch)?;
        changes.insert("updatedAt".into(), timestamp(Utc::now()));
        let merged = self.store.merge(USERS, uid, changes).await?;
        decode(USERS, uid, merged)
    }

    async fn delete_user_profile(&self, uid: &str) -> RepoResult<bool> {
        Ok(self.store.delete(USERS, uid).await?)
    }
}

// ---------------- Community ----------------

fn author_name(who: &Identity) -> Option<String> {
    who.name.clone().or_else(|| who.email.clone())
}

fn require_content(content: &str) -> RepoResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(RepoError::Invalid("content is required".into()));
    }
    if content.chars().count() > 5000 {
        return Err(RepoError::Invalid("content must be at most 5000 characters".into()));
    }
    Ok(content.to_string())
}

#[async_trait]
impl CommunityRepo for StoreRepo {
    async fn create_post(&self, author: &Identity, new: NewPost) -> RepoResult<CommunityPost> {
        let now = Utc::now();
        let post = CommunityPost {
            id: Uuid::new_v4().to_string(),
            user_id: author.uid.clone(),
            author_name: author_name(author),
            title: new.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            content: require_content(&new.content)?,
            like_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.create(COMMUNITY_POSTS, &post.id, encode(&post)?).await?;
        Ok(post)
    }

    async fn list_posts(&self) -> RepoResult<Vec<CommunityPost>> {
        let docs = self.store.list(COMMUNITY_POSTS).await?;
        let mut posts: Vec<CommunityPost> = decode_all(COMMUNITY_POSTS, docs, |id, d| decode(COMMUNITY_POSTS, id, d));
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn get_post(&self, id: &str) -> RepoResult<Option<CommunityPost>> {
        match self.store.get(COMMUNITY_POSTS, id).await? {
            Some(doc) => decode(COMMUNITY_POSTS, id, doc).map(Some),
            None => Ok(None),
        }
    }

    async fn add_comment(&self, post_id: &str, author: &Identity, new: NewComment) -> RepoResult<CommunityComment> {
        if self.store.get(COMMUNITY_POSTS, post_id).await?.is_none() {
            return Err(RepoError::NotFound);
        }
        let comment = CommunityComment {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            user_id: author.uid.clone(),
            author_name: author_name(author),
            content: require_content(&new.content)?,
            created_at: Utc::now(),
        };
        self.store.create(COMMUNITY_COMMENTS, &comment.id, encode(&comment)?).await?;
        self.bump(COMMUNITY_POSTS, post_id, "commentCount", 1).await;
        Ok(comment)
    }

    async fn list_comments(&self, post_id: &str) -> RepoResult<Vec<CommunityComment>> {
        let docs = self.store.find_eq(COMMUNITY_COMMENTS, "postId", &Value::from(post_id)).await?;
        let mut comments: Vec<CommunityComment> =
            decode_all(COMMUNITY_COMMENTS, docs, |id, d| decode(COMMUNITY_COMMENTS, id, d));
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn toggle_like(&self, user_id: &str, post_id: &str) -> RepoResult<bool> {
        if self.store.get(COMMUNITY_POSTS, post_id).await?.is_none() {
            return Err(RepoError::NotFound);
        }
        let key = like_key(user_id, post_id);
        if self.store.delete(COMMUNITY_LIKES, &key).await? {
            self.bump(COMMUNITY_POSTS, post_id, "likeCount", -1).await;
            return Ok(false);
        }
        let like = CommunityLike { user_id: user_id.to_string(), post_id: post_id.to_string(), created_at: Utc::now() };
        self.store.set(COMMUNITY_LIKES, &key, encode(&like)?).await?;
        self.bump(COMMUNITY_POSTS, post_id, "likeCount", 1).await;
        Ok(true)
    }
}

// ---------------- Account purge ----------------

#[async_trait]
impl UserContentRepo for StoreRepo {
    async fn purge_user_content(&self, uid: &str) -> RepoResult<BTreeMap<String, usize>> {
        let owned = self.owned_ids(uid).await?;
        let mut counts = BTreeMap::new();
        let mut ops = Vec::new();
        for (collection, ids) in owned {
            counts.insert(collection.to_string(), ids.len());
            ops.extend(ids.into_iter().map(|id| WriteOp::Delete { collection: collection.to_string(), id }));
        }

        let batches = WriteBatch::chunked(ops);
        let n_batches = batches.len();
        try_join_all(batches.into_iter().map(|b| self.store.commit(b))).await?;
        info!(uid, batches = n_batches, ?counts, "user content purged");
        Ok(counts)
    }

    async fn user_content_counts(&self, uid: &str) -> RepoResult<BTreeMap<String, usize>> {
        Ok(self
            .owned_ids(uid)
            .await?
            .into_iter()
            .map(|(c, ids)| (c.to_string(), ids.len()))
            .collect())
    }
}
