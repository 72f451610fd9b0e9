use crate::error::ApiErrorBody;
use crate::gate::{DeleteUserRequest, PromoteResponse, SetRoleRequest};
use crate::models::*;
use crate::routes::listings::{SeedResponse, StatusChange};
use crate::routes::social::{FavoriteState, LikeState, ReportStatusChange};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::listings::list_listings,
        crate::routes::listings::create_listing,
        crate::routes::listings::get_listing,
        crate::routes::listings::update_listing,
        crate::routes::listings::delete_listing,
        crate::routes::listings::change_listing_status,
        crate::routes::listings::record_view,
        crate::routes::listings::admin_hard_delete,
        crate::routes::listings::user_listings,
        crate::routes::listings::seed,
        crate::routes::social::list_favorites,
        crate::routes::social::favorite_status,
        crate::routes::social::toggle_favorite,
        crate::routes::social::create_report,
        crate::routes::social::admin_list_reports,
        crate::routes::social::admin_update_report,
        crate::routes::social::get_me,
        crate::routes::social::update_me,
        crate::routes::social::list_posts,
        crate::routes::social::create_post,
        crate::routes::social::list_comments,
        crate::routes::social::add_comment,
        crate::routes::social::toggle_like,
        crate::routes::admin::promote,
        crate::routes::admin::set_role,
        crate::routes::admin::delete_user,
        crate::routes::healthz,
    ),
    components(schemas(
        Listing, NewListing, ListingPatch, Category, RoommateType, ListingStatus,
        PropertyType, Amenity, Costs, Preferences, Contact,
        GenderPreference, OccupationPreference, SchedulePreference, CleanlinessPreference,
        HabitPreference, PetPreference, MoveInTime,
        UserProfile, ProfilePatch, Role, Favorite,
        Report, NewReport, ReportReason, ReportStatus,
        CommunityPost, NewPost, CommunityComment, NewComment,
        StatusChange, SeedResponse, FavoriteState, LikeState, ReportStatusChange,
        SetRoleRequest, DeleteUserRequest, PromoteResponse, ApiErrorBody
    )),
    tags(
        (name = "listings", description = "Listing browse, posting and moderation"),
        (name = "social", description = "Favorites, reports, profiles and the community board"),
        (name = "admin", description = "Privileged account operations"),
    )
)]
pub struct ApiDoc;
