use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tracing::{info, warn};

use super::collections::LISTINGS;
use super::{decode, decode_all, encode, ListingSource, Outcome, RepoError, RepoResult};
use crate::models::*;
use crate::store::{Document, DocumentStore, StoreError};

const ID_SUFFIX_LEN: usize = 20;

/// New category-prefixed listing id, e.g. `rm-Xq3...`.
pub fn generate_listing_id(category: Category) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", category.prefix(), suffix)
}

/// Decode a stored listing. The category is resolved from the id prefix first, then the
/// stored field, then falls back to roommate.
pub fn decode_listing(id: &str, mut doc: Document) -> RepoResult<Listing> {
    if let Some(Value::String(stored_id)) = doc.get("id") {
        if stored_id != id {
            return Err(RepoError::Malformed {
                collection: LISTINGS,
                id: id.to_string(),
                reason: format!("id field '{stored_id}' does not match the document key"),
            });
        }
    }
    let stored = doc.remove("category");
    let category = resolve_category(id, stored.as_ref().and_then(Value::as_str));
    doc.insert("category".into(), Value::from(category.as_str()));
    doc.insert("id".into(), Value::from(id));
    // older records call the description "introduction"; an edit may have added both
    if let Some(intro) = doc.remove("introduction") {
        doc.entry("description").or_insert(intro);
    }

    let mut listing: Listing = decode(LISTINGS, id, doc)?;
    if listing.category != Category::Roommate {
        listing.roommate_type = None;
    }
    Ok(listing)
}

fn newest_first(listings: &mut [Listing]) {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn prepare_new(new: NewListing, initial_status: ListingStatus) -> RepoResult<Listing> {
    new.validate().map_err(RepoError::Invalid)?;
    let id = new.id.clone().unwrap_or_else(|| generate_listing_id(new.category));
    let status = new.status.unwrap_or(initial_status);
    Ok(new.into_listing(id, status, Utc::now()))
}

// ---------------- Document store backed source ----------------

#[derive(Clone)]
pub struct StoreListingSource {
    store: Arc<dyn DocumentStore>,
    initial_status: ListingStatus,
}

impl StoreListingSource {
    pub fn new(store: Arc<dyn DocumentStore>, initial_status: ListingStatus) -> Self {
        Self { store, initial_status }
    }

}

fn decoded(docs: Vec<(String, Document)>) -> Vec<Listing> {
    let mut listings = decode_all(LISTINGS, docs, decode_listing);
    newest_first(&mut listings);
    listings
}

#[async_trait]
impl ListingSource for StoreListingSource {
    async fn get_listings(&self) -> RepoResult<Vec<Listing>> {
        let docs = self.store.list(LISTINGS).await?;
        Ok(decoded(docs))
    }

    async fn get_listings_by_category(&self, category: Category) -> RepoResult<Vec<Listing>> {
        // filter on the resolved category so a conflicting stored field cannot misfile a listing
        let docs = self.store.list(LISTINGS).await?;
        let mut listings = decoded(docs);
        listings.retain(|l| l.category == category && l.status != ListingStatus::Deleted);
        Ok(listings)
    }

    async fn get_listing_by_id(&self, id: &str) -> RepoResult<Option<Listing>> {
        match self.store.get(LISTINGS, id).await? {
            Some(doc) => decode_listing(id, doc).map(Some),
            None => Ok(None),
        }
    }

    async fn get_listings_by_user_id(&self, user_id: &str) -> RepoResult<Vec<Listing>> {
        let docs = self.store.find_eq(LISTINGS, "userId", &Value::from(user_id)).await?;
        Ok(decoded(docs))
    }

    async fn create_listing(&self, new: NewListing) -> RepoResult<Listing> {
        let listing = prepare_new(new, self.initial_status)?;
        self.store.create(LISTINGS, &listing.id, encode(&listing)?).await?;
        metrics::increment_counter!("listings_created_total", "category" => listing.category.as_str());
        info!(id = %listing.id, status = %listing.status, "listing created");
        Ok(listing)
    }

    async fn update_listing(&self, id: &str, patch: ListingPatch) -> RepoResult<Listing> {
        let mut listing = self.get_listing_by_id(id).await?.ok_or(RepoError::NotFound)?;
        patch.apply_to(&mut listing).map_err(RepoError::Invalid)?;
        listing.updated_at = Utc::now();

        // write back the normalised values of the touched fields only, leaving counters alone
        let touched = encode(&patch)?;
        let mut changes = encode(&listing)?;
        changes.retain(|k, _| touched.contains_key(k) || k == "updatedAt");
        self.store.merge(LISTINGS, id, changes).await?;
        if let Some(status) = patch.status {
            info!(id, %status, "listing status changed");
        }
        Ok(listing)
    }

    async fn hard_delete_listing(&self, id: &str) -> RepoResult<()> {
        if self.store.delete(LISTINGS, id).await? {
            info!(id, "listing hard-deleted");
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }

    async fn increment_view_count(&self, id: &str) -> Outcome {
        match self.store.increment(LISTINGS, id, "viewCount", 1).await {
            Ok(()) => {
                metrics::increment_counter!("listing_views_total");
                Outcome::Done(())
            }
            Err(e) => {
                warn!(id, "view count not recorded: {e}");
                Outcome::BestEffort(e.to_string())
            }
        }
    }
}

// ---------------- Static fixture source ----------------

/// Serves the built-in sample listings. Mutations only live in process memory.
pub struct FixtureListingSource {
    listings: RwLock<Vec<Listing>>,
    initial_status: ListingStatus,
}

impl FixtureListingSource {
    pub fn new(listings: Vec<Listing>, initial_status: ListingStatus) -> Self {
        Self { listings: RwLock::new(listings), initial_status }
    }

    pub fn with_samples(initial_status: ListingStatus) -> Self {
        Self::new(crate::fixtures::sample_listings(), initial_status)
    }

    fn snapshot(&self) -> RepoResult<Vec<Listing>> {
        let mut v = self.listings.read().map_err(|_| poisoned())?.clone();
        newest_first(&mut v);
        Ok(v)
    }
}

fn poisoned() -> RepoError {
    RepoError::Store(StoreError::Unavailable("fixture lock poisoned".into()))
}

#[async_trait]
impl ListingSource for FixtureListingSource {
    async fn get_listings(&self) -> RepoResult<Vec<Listing>> {
        self.snapshot()
    }

    async fn get_listings_by_category(&self, category: Category) -> RepoResult<Vec<Listing>> {
        let mut v = self.snapshot()?;
        v.retain(|l| l.category == category && l.status != ListingStatus::Deleted);
        Ok(v)
    }

    async fn get_listing_by_id(&self, id: &str) -> RepoResult<Option<Listing>> {
        let v = self.listings.read().map_err(|_| poisoned())?;
        Ok(v.iter().find(|l| l.id == id).cloned())
    }

    async fn get_listings_by_user_id(&self, user_id: &str) -> RepoResult<Vec<Listing>> {
        let mut v = self.snapshot()?;
        v.retain(|l| l.is_owned_by(user_id));
        Ok(v)
    }

    async fn create_listing(&self, new: NewListing) -> RepoResult<Listing> {
        let listing = prepare_new(new, self.initial_status)?;
        let mut v = self.listings.write().map_err(|_| poisoned())?;
        if v.iter().any(|l| l.id == listing.id) {
            return Err(RepoError::Conflict);
        }
        v.push(listing.clone());
        Ok(listing)
    }

    async fn update_listing(&self, id: &str, patch: ListingPatch) -> RepoResult<Listing> {
        let mut v = self.listings.write().map_err(|_| poisoned())?;
        let listing = v.iter_mut().find(|l| l.id == id).ok_or(RepoError::NotFound)?;
        patch.apply_to(listing).map_err(RepoError::Invalid)?;
        listing.updated_at = Utc::now();
        Ok(listing.clone())
    }

    async fn hard_delete_listing(&self, id: &str) -> RepoResult<()> {
        let mut v = self.listings.write().map_err(|_| poisoned())?;
        let before = v.len();
        v.retain(|l| l.id != id);
        if v.len() == before { Err(RepoError::NotFound) } else { Ok(()) }
    }

    async fn increment_view_count(&self, id: &str) -> Outcome {
        let Ok(mut v) = self.listings.write() else {
            return Outcome::BestEffort("fixture lock poisoned".into());
        };
        match v.iter_mut().find(|l| l.id == id) {
            Some(l) => {
                l.view_count += 1;
                Outcome::Done(())
            }
            None => Outcome::BestEffort(format!("listing {id} not found")),
        }
    }
}
