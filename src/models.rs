use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Listing enums
// ---------------------------------------------------------------------------

/// Listing category. The id prefix of a listing always encodes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    Roommate,
    Roomshare,
    ShortTerm,
    Sublease,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Roommate,
        Category::Roomshare,
        Category::ShortTerm,
        Category::Sublease,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Roommate => "roommate",
            Category::Roomshare => "roomshare",
            Category::ShortTerm => "short-term",
            Category::Sublease => "sublease",
        }
    }

    /// Identifier prefix, including the trailing dash.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::Roommate => "rm-",
            Category::Roomshare => "rs-",
            Category::ShortTerm => "st-",
            Category::Sublease => "sl-",
        }
    }

    /// Category encoded by a listing id, if the id carries a known prefix.
    pub fn from_id(id: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| id.starts_with(c.prefix()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// Resolve the category of a listing: id prefix, then the stored field, then roommate.
pub fn resolve_category(id: &str, stored: Option<&str>) -> Category {
    Category::from_id(id)
        .or_else(|| stored.and_then(|s| s.parse().ok()))
        .unwrap_or(Category::Roommate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RoommateType {
    HaveRoom,
    FindPartner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Pending,
    Hidden,
    Rejected,
    Deleted,
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner,
    Moderator,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Pending => "pending",
            ListingStatus::Hidden => "hidden",
            ListingStatus::Rejected => "rejected",
            ListingStatus::Deleted => "deleted",
        }
    }

    /// Listing status state machine. Same-state moves are always allowed (no-op).
    pub fn can_transition(self, to: ListingStatus, actor: Actor) -> bool {
        use ListingStatus::*;
        if self == to {
            return true;
        }
        match actor {
            Actor::Moderator => true,
            Actor::Owner => matches!(
                (self, to),
                (Active, Hidden)
                    | (Hidden, Active)
                    | (Rejected, Pending)
                    | (Active | Pending | Hidden | Rejected, Deleted)
            ),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "pending" => Ok(ListingStatus::Pending),
            "hidden" => Ok(ListingStatus::Hidden),
            "rejected" => Ok(ListingStatus::Rejected),
            "deleted" => Ok(ListingStatus::Deleted),
            other => Err(format!("unknown listing status '{other}'")),
        }
    }
}

// Closed tag sets used by listing forms.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Apartment,
    MiniApartment,
    House,
    Studio,
    Dormitory,
    Villa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Amenity {
    AirConditioner,
    WashingMachine,
    Fridge,
    Wifi,
    Parking,
    Elevator,
    Security,
    Kitchen,
    Furniture,
    Balcony,
    WaterHeater,
    PrivateBathroom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GenderPreference {
    Male,
    Female,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OccupationPreference {
    Student,
    OfficeWorker,
    Freelancer,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulePreference {
    EarlyBird,
    NightOwl,
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CleanlinessPreference {
    VeryClean,
    Clean,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum HabitPreference {
    NoSmoking,
    NoAlcohol,
    Quiet,
    Social,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PetPreference {
    NoPets,
    CatsOk,
    DogsOk,
    AnyPets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MoveInTime {
    Asap,
    WithinWeek,
    WithinMonth,
    Flexible,
}

// ---------------------------------------------------------------------------
// Listing records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Costs {
    pub rent: Option<String>,
    pub deposit: Option<String>,
    pub electricity: Option<String>,
    pub water: Option<String>,
    pub internet: Option<String>,
    pub service: Option<String>,
    pub parking: Option<String>,
    pub management: Option<String>,
    pub other: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub gender: Vec<GenderPreference>,
    pub status: Vec<OccupationPreference>,
    pub schedule: Vec<SchedulePreference>,
    pub cleanliness: Vec<CleanlinessPreference>,
    pub habits: Vec<HabitPreference>,
    pub pets: Vec<PetPreference>,
    pub move_in_time: Vec<MoveInTime>,
    pub status_other: Option<String>,
    pub habits_other: Option<String>,
    pub pets_other: Option<String>,
    pub other: Option<String>,
}

impl Preferences {
    fn normalize(&mut self) {
        dedup_tags(&mut self.gender);
        dedup_tags(&mut self.status);
        dedup_tags(&mut self.schedule);
        dedup_tags(&mut self.cleanliness);
        dedup_tags(&mut self.habits);
        dedup_tags(&mut self.pets);
        dedup_tags(&mut self.move_in_time);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub phone: String,
    #[serde(default)]
    pub zalo: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
}

fn legacy_status() -> ListingStatus {
    // records written before moderation existed were always public
    ListingStatus::Active
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roommate_type: Option<RoommateType>,
    pub title: String,
    #[serde(default, alias = "introduction")]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub specific_address: Option<String>,
    #[serde(default)]
    pub building_name: Option<String>,
    #[serde(default)]
    pub move_in_date: Option<String>,
    #[serde(default)]
    pub property_types: Vec<PropertyType>,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub amenities_other: Option<String>,
    #[serde(default)]
    pub costs: Costs,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub room_size: Option<String>,
    #[serde(default)]
    pub current_occupants: Option<String>,
    #[serde(default)]
    pub total_rooms: Option<String>,
    #[serde(default)]
    pub min_contract_duration: Option<String>,
    pub contact: Contact,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "legacy_status")]
    pub status: ListingStatus,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub favorite_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Visible to anonymous visitors.
    pub fn is_public(&self) -> bool {
        self.status == ListingStatus::Active
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.user_id.as_deref() == Some(uid)
    }
}

/// Payload for creating a listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    /// Optional explicit id; must carry the category prefix.
    #[serde(default)]
    pub id: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub roommate_type: Option<RoommateType>,
    pub title: String,
    #[serde(default, alias = "introduction")]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub specific_address: Option<String>,
    #[serde(default)]
    pub building_name: Option<String>,
    #[serde(default)]
    pub move_in_date: Option<String>,
    #[serde(default)]
    pub property_types: Vec<PropertyType>,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub amenities_other: Option<String>,
    #[serde(default)]
    pub costs: Costs,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub room_size: Option<String>,
    #[serde(default)]
    pub current_occupants: Option<String>,
    #[serde(default)]
    pub total_rooms: Option<String>,
    #[serde(default)]
    pub min_contract_duration: Option<String>,
    pub contact: Contact,
    /// Set by the server from the authenticated caller.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Trusted callers (seeding) may pick the initial status; never read from clients.
    #[serde(skip)]
    pub status: Option<ListingStatus>,
}

impl NewListing {
    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)?;
        if self.price.trim().is_empty() {
            return Err("price is required".into());
        }
        validate_phone(&self.contact.phone)?;
        if self.category == Category::Roommate && self.roommate_type.is_none() {
            return Err("roommateType is required for roommate listings".into());
        }
        if let Some(id) = &self.id {
            validate_listing_id(id, self.category)?;
        }
        Ok(())
    }

    /// Build the stored record. Callers validate first.
    pub fn into_listing(self, id: String, status: ListingStatus, now: DateTime<Utc>) -> Listing {
        let mut property_types = self.property_types;
        let mut amenities = self.amenities;
        let mut preferences = self.preferences;
        dedup_tags(&mut property_types);
        dedup_tags(&mut amenities);
        preferences.normalize();
        let roommate_type = match self.category {
            Category::Roommate => self.roommate_type,
            _ => None,
        };
        Listing {
            id,
            category: self.category,
            roommate_type,
            title: self.title.trim().to_string(),
            description: self.description,
            price: self.price.trim().to_string(),
            city: self.city,
            district: self.district,
            specific_address: self.specific_address,
            building_name: self.building_name,
            move_in_date: self.move_in_date,
            property_types,
            amenities,
            amenities_other: self.amenities_other,
            costs: self.costs,
            preferences,
            room_size: self.room_size,
            current_occupants: self.current_occupants,
            total_rooms: self.total_rooms,
            min_contract_duration: self.min_contract_duration,
            contact: self.contact,
            user_id: self.user_id,
            status,
            view_count: 0,
            favorite_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Merge-patch over a listing: only `Some` fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roommate_type: Option<RoommateType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "introduction")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_in_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_types: Option<Vec<PropertyType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<Amenity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities_other: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<Costs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_occupants: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rooms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_contract_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
}

impl ListingPatch {
    pub fn with_status(status: ListingStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    /// Apply onto `listing`, validating the changed fields. On error `listing` is untouched.
    pub fn apply_to(&self, listing: &mut Listing) -> Result<(), String> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = &self.price {
            if price.trim().is_empty() {
                return Err("price is required".into());
            }
        }
        if let Some(contact) = &self.contact {
            validate_phone(&contact.phone)?;
        }
        if self.roommate_type.is_some() && listing.category != Category::Roommate {
            return Err("roommateType only applies to roommate listings".into());
        }

        let p = self.clone();
        if let Some(v) = p.roommate_type { listing.roommate_type = Some(v); }
        if let Some(v) = p.title { listing.title = v.trim().to_string(); }
        if let Some(v) = p.description { listing.description = v; }
        if let Some(v) = p.price { listing.price = v.trim().to_string(); }
        if let Some(v) = p.city { listing.city = Some(v); }
        if let Some(v) = p.district { listing.district = Some(v); }
        if let Some(v) = p.specific_address { listing.specific_address = Some(v); }
        if let Some(v) = p.building_name { listing.building_name = Some(v); }
        if let Some(v) = p.move_in_date { listing.move_in_date = Some(v); }
        if let Some(mut v) = p.property_types { dedup_tags(&mut v); listing.property_types = v; }
        if let Some(mut v) = p.amenities { dedup_tags(&mut v); listing.amenities = v; }
        if let Some(v) = p.amenities_other { listing.amenities_other = Some(v); }
        if let Some(v) = p.costs { listing.costs = v; }
        if let Some(mut v) = p.preferences { v.normalize(); listing.preferences = v; }
        if let Some(v) = p.room_size { listing.room_size = Some(v); }
        if let Some(v) = p.current_occupants { listing.current_occupants = Some(v); }
        if let Some(v) = p.total_rooms { listing.total_rooms = Some(v); }
        if let Some(v) = p.min_contract_duration { listing.min_contract_duration = Some(v); }
        if let Some(v) = p.contact { listing.contact = v; }
        if let Some(v) = p.status { listing.status = v; }
        Ok(())
    }
}

fn dedup_tags<T: Ord>(tags: &mut Vec<T>) {
    tags.sort();
    tags.dedup();
}

fn validate_title(title: &str) -> Result<(), String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title is required".into());
    }
    if title.chars().count() > 200 {
        return Err("title must be at most 200 characters".into());
    }
    Ok(())
}

/// Vietnamese mobile numbers: 9-12 digits, optionally with `+`, spaces, dots or dashes.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("contact.phone is required".into());
    }
    if !phone.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '.' | '-')) {
        return Err("contact.phone contains invalid characters".into());
    }
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !(9..=12).contains(&digits) {
        return Err("contact.phone must contain 9 to 12 digits".into());
    }
    Ok(())
}

pub fn validate_listing_id(id: &str, category: Category) -> Result<(), String> {
    let Some(suffix) = id.strip_prefix(category.prefix()) else {
        return Err(format!("listing id '{id}' must start with '{}'", category.prefix()));
    };
    if suffix.is_empty()
        || !suffix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!("listing id '{id}' has an invalid suffix"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    #[serde(rename = "mod")]
    Moderator,
    Tester,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "mod",
            Role::Tester => "tester",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    pub fn is_moderator(self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }

    /// Roles an admin may hand out through set-role. Admin is only reachable via the allowlist.
    pub fn parse_assignable(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "mod" => Some(Role::Moderator),
            "tester" => Some(Role::Tester),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_year: Option<u16>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub lifestyle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Self-service profile edit. Role is deliberately absent; unknown fields are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifestyle: Option<String>,
}

impl ProfilePatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(year) = self.birth_year {
            if !(1900..=2100).contains(&year) {
                return Err("birthYear is out of range".into());
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub user_id: String,
    pub listing_id: String,
    pub created_at: DateTime<Utc>,
}

/// `{user}_{target}` with `%` and `_` escaped in the user part, so the first `_` always
/// separates the pair. Plain uids keep the bare `{user}_{target}` form.
fn pair_key(user_id: &str, target_id: &str) -> String {
    let mut key = String::with_capacity(user_id.len() + target_id.len() + 1);
    for c in user_id.chars() {
        match c {
            '%' => key.push_str("%25"),
            '_' => key.push_str("%5F"),
            c => key.push(c),
        }
    }
    key.push('_');
    key.push_str(target_id);
    key
}

/// Document key of a favorite; one document per (user, listing) pair.
pub fn favorite_key(user_id: &str, listing_id: &str) -> String {
    pair_key(user_id, listing_id)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

pub const ANONYMOUS_REPORTER: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReportReason {
    Spam,
    Scam,
    Inappropriate,
    Duplicate,
    WrongInfo,
    Other,
}

/// Declaration order is the review order; statuses only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
        }
    }

    pub fn can_advance_to(self, next: ReportStatus) -> bool {
        next > self
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "reviewed" => Ok(ReportStatus::Reviewed),
            "resolved" => Ok(ReportStatus::Resolved),
            other => Err(format!("unknown report status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub listing_id: String,
    pub reported_by: String,
    pub reason: ReportReason,
    #[serde(default)]
    pub details: Option<String>,
    pub status: ReportStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn anonymous() -> String {
    ANONYMOUS_REPORTER.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub listing_id: String,
    /// Overwritten by the server with the caller's uid or "anonymous".
    #[serde(default = "anonymous")]
    pub reported_by: String,
    pub reason: ReportReason,
    #[serde(default)]
    pub details: Option<String>,
}

// ---------------------------------------------------------------------------
// Community board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityComment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    #[serde(default)]
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityLike {
    pub user_id: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

pub fn like_key(user_id: &str, post_id: &str) -> String {
    pair_key(user_id, post_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_keys_never_collide_across_the_separator() {
        assert_eq!(favorite_key("u1", "rm-abc"), "u1_rm-abc");
        assert_ne!(favorite_key("a", "rm-b_rm-c"), favorite_key("a_rm-b", "rm-c"));
        assert_eq!(favorite_key("a_rm-b", "rm-c"), "a%5Frm-b_rm-c");
        assert_ne!(like_key("a%5Fb", "p"), like_key("a_b", "p"));
    }

    #[test]
    fn prefix_beats_stored_category() {
        assert_eq!(resolve_category("st-abc", Some("roommate")), Category::ShortTerm);
        assert_eq!(resolve_category("legacy-1", Some("sublease")), Category::Sublease);
        assert_eq!(resolve_category("legacy-1", Some("nonsense")), Category::Roommate);
        assert_eq!(resolve_category("legacy-1", None), Category::Roommate);
    }

    #[test]
    fn owner_transitions_are_restricted() {
        use ListingStatus::*;
        assert!(Active.can_transition(Hidden, Actor::Owner));
        assert!(Hidden.can_transition(Active, Actor::Owner));
        assert!(Rejected.can_transition(Pending, Actor::Owner));
        assert!(Pending.can_transition(Deleted, Actor::Owner));
        assert!(!Pending.can_transition(Active, Actor::Owner));
        assert!(!Rejected.can_transition(Active, Actor::Owner));
        assert!(!Deleted.can_transition(Active, Actor::Owner));
        assert!(Deleted.can_transition(Active, Actor::Moderator));
        assert!(Deleted.can_transition(Deleted, Actor::Owner));
    }

    #[test]
    fn report_status_only_moves_forward() {
        use ReportStatus::*;
        assert!(Pending.can_advance_to(Reviewed));
        assert!(Pending.can_advance_to(Resolved));
        assert!(Reviewed.can_advance_to(Resolved));
        assert!(!Resolved.can_advance_to(Pending));
        assert!(!Resolved.can_advance_to(Reviewed));
        assert!(!Reviewed.can_advance_to(Reviewed));
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_value(Role::Moderator).unwrap(), "mod");
        assert_eq!(serde_json::from_value::<Role>("tester".into()).unwrap(), Role::Tester);
        assert_eq!(Role::parse_assignable("admin"), None);
        assert_eq!(Role::parse_assignable("mod"), Some(Role::Moderator));
    }

    #[test]
    fn new_listing_validation() {
        let mut n = NewListing {
            category: Category::Roommate,
            title: "Tìm bạn ở ghép".into(),
            price: "3000000".into(),
            contact: Contact { phone: "0901 234 567".into(), ..Default::default() },
            ..Default::default()
        };
        assert!(n.validate().unwrap_err().contains("roommateType"));
        n.roommate_type = Some(RoommateType::HaveRoom);
        assert!(n.validate().is_ok());
        n.id = Some("rs-abc".into());
        assert!(n.validate().is_err());
        n.id = Some("rm-abc".into());
        assert!(n.validate().is_ok());
        n.contact.phone = "12ab".into();
        assert!(n.validate().is_err());
    }

    #[test]
    fn non_roommate_drops_roommate_type_and_dedups_tags() {
        let n = NewListing {
            category: Category::Sublease,
            roommate_type: Some(RoommateType::FindPartner),
            title: " Sang lại phòng ".into(),
            price: "4500000".into(),
            amenities: vec![Amenity::Wifi, Amenity::Fridge, Amenity::Wifi],
            contact: Contact { phone: "0912345678".into(), ..Default::default() },
            ..Default::default()
        };
        let l = n.into_listing("sl-x".into(), ListingStatus::Pending, Utc::now());
        assert_eq!(l.roommate_type, None);
        assert_eq!(l.title, "Sang lại phòng");
        assert_eq!(l.amenities, vec![Amenity::Fridge, Amenity::Wifi]);
    }
}
