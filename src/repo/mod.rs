use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::identity::Identity;
use crate::models::*;
use crate::store::{Document, StoreError};

pub mod listings;
pub mod store_repo;

pub use listings::{FixtureListingSource, StoreListingSource};
pub use store_repo::StoreRepo;

pub mod collections {
    pub const LISTINGS: &str = "listings";
    pub const USERS: &str = "users";
    pub const FAVORITES: &str = "favorites";
    pub const REPORTS: &str = "reports";
    pub const COMMUNITY_POSTS: &str = "community_posts";
    pub const COMMUNITY_COMMENTS: &str = "community_comments";
    pub const COMMUNITY_LIKES: &str = "community_likes";
    /// Identity subjects whose tokens are no longer accepted.
    pub const REVOKED_SUBJECTS: &str = "revoked_subjects";

    /// Collections holding documents that belong to a user, with the field naming the owner.
    pub const USER_OWNED: [(&str, &str); 6] = [
        (LISTINGS, "userId"),
        (COMMUNITY_POSTS, "userId"),
        (COMMUNITY_COMMENTS, "userId"),
        (COMMUNITY_LIKES, "userId"),
        (FAVORITES, "userId"),
        (REPORTS, "reportedBy"),
    ];
}

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("{0}")]
    Invalid(String),
    #[error("cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("malformed {collection} document '{id}': {reason}")]
    Malformed { collection: &'static str, id: String, reason: String },
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RepoError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => RepoError::NotFound,
            StoreError::AlreadyExists => RepoError::Conflict,
            other => RepoError::Store(other),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Result of a step whose failure must not fail the surrounding operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    Done(T),
    /// The step was skipped or failed; the reason has already been logged.
    BestEffort(String),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::BestEffort(_) => None,
        }
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> RepoResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RepoError::Invalid("record did not serialise to an object".into())),
        Err(e) => Err(RepoError::Invalid(e.to_string())),
    }
}

/// Parse a stored document into its typed record; the only place untyped data is read.
pub(crate) fn decode<T: DeserializeOwned>(collection: &'static str, id: &str, doc: Document) -> RepoResult<T> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| RepoError::Malformed {
        collection,
        id: id.to_string(),
        reason: e.to_string(),
    })
}

/// Decode every document, logging and skipping the ones that fail to parse.
pub(crate) fn decode_all<T, F>(collection: &'static str, docs: Vec<(String, Document)>, mut decode_one: F) -> Vec<T>
where
    F: FnMut(&str, Document) -> RepoResult<T>,
{
    docs.into_iter()
        .filter_map(|(id, doc)| match decode_one(&id, doc) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!(collection, id = %id, "skipping record: {e}");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Listing storage capability, chosen at startup (fixture data or the document store).
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Every listing regardless of category or status, newest first.
    async fn get_listings(&self) -> RepoResult<Vec<Listing>>;
    /// Listings of one category excluding soft-deleted ones, newest first.
    async fn get_listings_by_category(&self, category: Category) -> RepoResult<Vec<Listing>>;
    /// `Ok(None)` when absent.
    async fn get_listing_by_id(&self, id: &str) -> RepoResult<Option<Listing>>;
    async fn get_listings_by_user_id(&self, user_id: &str) -> RepoResult<Vec<Listing>>;
    async fn create_listing(&self, new: NewListing) -> RepoResult<Listing>;
    /// Merge-patch; stamps `updatedAt`.
    async fn update_listing(&self, id: &str, patch: ListingPatch) -> RepoResult<Listing>;
    async fn hard_delete_listing(&self, id: &str) -> RepoResult<()>;
    async fn increment_view_count(&self, id: &str) -> Outcome;

    /// Soft delete: the record stays readable by id.
    async fn delete_listing(&self, id: &str) -> RepoResult<Listing> {
        self.update_listing(id, ListingPatch::with_status(ListingStatus::Deleted)).await
    }

    async fn transition_status(&self, id: &str, to: ListingStatus, actor: Actor) -> RepoResult<Listing> {
        let current = self.get_listing_by_id(id).await?.ok_or(RepoError::NotFound)?;
        if !current.status.can_transition(to, actor) {
            return Err(RepoError::InvalidTransition {
                from: current.status.to_string(),
                to: to.to_string(),
            });
        }
        if current.status == to {
            return Ok(current);
        }
        self.update_listing(id, ListingPatch::with_status(to)).await
    }
}

// ---------------------------------------------------------------------------
// Favorites, reports, users, community
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    async fn is_favorited(&self, user_id: &str, listing_id: &str) -> RepoResult<bool>;
    /// Flip the saved state; returns `true` when the listing is now favorited.
    async fn toggle_favorite(&self, user_id: &str, listing_id: &str) -> RepoResult<bool>;
    async fn list_favorites(&self, user_id: &str) -> RepoResult<Vec<Favorite>>;
}

#[async_trait]
pub trait ReportRepo: Send + Sync {
    async fn create_report(&self, new: NewReport) -> RepoResult<Report>;
    async fn get_pending_reports(&self) -> RepoResult<Vec<Report>>;
    async fn get_all_reports(&self) -> RepoResult<Vec<Report>>;
    /// Forward-only review transition. An unavailable store yields `Outcome::BestEffort`.
    async fn update_report_status(&self, id: &str, status: ReportStatus, reviewed_by: &str) -> RepoResult<Outcome<Report>>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, uid: &str) -> RepoResult<Option<UserProfile>>;
    /// Return the caller's profile, creating a `user`-role profile from token claims if absent.
    async fn ensure_user(&self, identity: &Identity) -> RepoResult<UserProfile>;
    /// Set `role`, creating the profile from token claims if absent.
    async fn upsert_role(&self, identity: &Identity, role: Role) -> RepoResult<UserProfile>;
    /// Set `role` on an existing profile.
    async fn set_user_role(&self, uid: &str, role: Role) -> RepoResult<UserProfile>;
    async fn update_profile(&self, uid: &str, patch: ProfilePatch) -> RepoResult<UserProfile>;
    async fn delete_user_profile(&self, uid: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait CommunityRepo: Send + Sync {
    async fn create_post(&self, author: &Identity, new: NewPost) -> RepoResult<CommunityPost>;
    async fn list_posts(&self) -> RepoResult<Vec<CommunityPost>>;
    async fn get_post(&self, id: &str) -> RepoResult<Option<CommunityPost>>;
    async fn add_comment(&self, post_id: &str, author: &Identity, new: NewComment) -> RepoResult<CommunityComment>;
    async fn list_comments(&self, post_id: &str) -> RepoResult<Vec<CommunityComment>>;
    /// Returns `true` when the post is now liked by the user.
    async fn toggle_like(&self, user_id: &str, post_id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait UserContentRepo: Send + Sync {
    /// Delete every document owned by `uid` across [`collections::USER_OWNED`].
    /// Returns the number of deleted documents per collection.
    async fn purge_user_content(&self, uid: &str) -> RepoResult<BTreeMap<String, usize>>;
    /// Number of documents owned by `uid` per collection.
    async fn user_content_counts(&self, uid: &str) -> RepoResult<BTreeMap<String, usize>>;
}

pub trait Repo: FavoriteRepo + ReportRepo + UserRepo + CommunityRepo + UserContentRepo {}

impl<T> Repo for T where T: FavoriteRepo + ReportRepo + UserRepo + CommunityRepo + UserContentRepo {}
