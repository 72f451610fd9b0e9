mod common;

use actix_web::{test, web, App};
use oghep::models::Role;
use oghep::{config, AppConfig};
use serde_json::{json, Value};

use common::{bearer, default_env, roommate_listing, test_env};

macro_rules! app {
    ($env:expr) => {
        test::init_service(App::new().app_data(web::Data::new($env.state.clone())).configure(config)).await
    };
}

async fn json_body(resp: actix_web::dev::ServiceResponse) -> Value {
    serde_json::from_slice(&test::read_body(resp).await).unwrap()
}

#[actix_web::test]
async fn listing_moderation_flow() {
    let env = default_env();
    let app = app!(env);
    let owner = env.user_with_role("lan", Role::User).await;
    let other = env.user_with_role("minh", Role::User).await;
    let moderator = env.user_with_role("mod1", Role::Moderator).await;
    let admin = env.user_with_role("root", Role::Admin).await;

    // anonymous create is rejected
    let req = test::TestRequest::post().uri("/api/listings").set_json(&roommate_listing("x")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/listings")
        .insert_header(bearer(&owner))
        .set_json(&roommate_listing("Phòng Quận 3 tìm bạn nữ"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created = json_body(resp).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("rm-"));
    assert_eq!(created["status"], "pending");
    assert_eq!(created["userId"], "lan");

    // pending is invisible to the public but visible to the owner
    let req = test::TestRequest::get().uri("/api/listings").to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await, json!([]));
    let req = test::TestRequest::get().uri(&format!("/api/listings/{id}")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::get()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&owner))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri("/api/listings?status=pending")
        .insert_header(bearer(&moderator))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await.as_array().unwrap().len(), 1);

    // owners cannot approve themselves
    let req = test::TestRequest::post()
        .uri(&format!("/api/listings/{id}/status"))
        .insert_header(bearer(&owner))
        .set_json(&json!({"status": "active"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri(&format!("/api/listings/{id}/status"))
        .insert_header(bearer(&moderator))
        .set_json(&json!({"status": "active"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["status"], "active");

    let req = test::TestRequest::get().uri("/api/listings?category=roommate").to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await.as_array().unwrap().len(), 1);
    let req = test::TestRequest::get().uri("/api/listings?category=sublease").to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await, json!([]));
    let req = test::TestRequest::get().uri("/api/listings?category=castle").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    for _ in 0..2 {
        let req = test::TestRequest::post().uri(&format!("/api/listings/{id}/view")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 204);
    }
    let req = test::TestRequest::get().uri(&format!("/api/listings/{id}")).to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["viewCount"], 2);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&other))
        .set_json(&json!({"title": "hijacked"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    assert_eq!(json_body(resp).await, json!({"error": "Not the listing owner"}));

    // status in a patch body is ignored
    let req = test::TestRequest::patch()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&owner))
        .set_json(&json!({"title": "Phòng Quận 3 còn trống", "status": "deleted"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = json_body(resp).await;
    assert_eq!(body["title"], "Phòng Quận 3 còn trống");
    assert_eq!(body["status"], "active");
    assert_eq!(body["viewCount"], 2);

    let req = test::TestRequest::post()
        .uri(&format!("/api/listings/{id}/status"))
        .insert_header(bearer(&owner))
        .set_json(&json!({"status": "hidden"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    let req = test::TestRequest::post().uri(&format!("/api/listings/{id}/view")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);
    let req = test::TestRequest::get()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&owner))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["status"], "hidden");
    assert_eq!(body["viewCount"], 2);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&other))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::delete()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&owner))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::get()
        .uri("/api/users/lan/listings")
        .insert_header(bearer(&owner))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await, json!([]));
    let req = test::TestRequest::get()
        .uri("/api/users/lan/listings")
        .insert_header(bearer(&moderator))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body[0]["status"], "deleted");

    // hard delete is admin only
    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/listings/{id}"))
        .insert_header(bearer(&moderator))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    assert_eq!(json_body(resp).await["error"], "Admin only");
    for expected in [204, 404] {
        let req = test::TestRequest::delete()
            .uri(&format!("/api/admin/listings/{id}"))
            .insert_header(bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), expected);
    }
}

#[actix_web::test]
async fn owner_cannot_edit_a_deleted_listing() {
    let env = default_env();
    let app = app!(env);
    let owner = env.user_with_role("lan", Role::User).await;
    let moderator = env.user_with_role("mod1", Role::Moderator).await;

    let req = test::TestRequest::post()
        .uri("/api/listings")
        .insert_header(bearer(&owner))
        .set_json(&roommate_listing("Phòng Bình Thạnh"))
        .to_request();
    let id = json_body(test::call_service(&app, req).await).await["id"].as_str().unwrap().to_string();
    let req = test::TestRequest::delete()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&owner))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&owner))
        .set_json(&json!({"title": "Sống lại"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(json_body(resp).await, json!({"error": "Listing not found"}));

    let req = test::TestRequest::get()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&moderator))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["title"], "Phòng Bình Thạnh");
    assert_eq!(body["status"], "deleted");
}

#[actix_web::test]
async fn rejected_listing_is_resubmitted_by_owner_edit() {
    let env = default_env();
    let app = app!(env);
    let owner = env.user_with_role("lan", Role::User).await;
    let moderator = env.user_with_role("mod1", Role::Moderator).await;

    let req = test::TestRequest::post()
        .uri("/api/listings")
        .insert_header(bearer(&owner))
        .set_json(&roommate_listing("Ở ghép Bình Thạnh"))
        .to_request();
    let id = json_body(test::call_service(&app, req).await).await["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/listings/{id}/status"))
        .insert_header(bearer(&moderator))
        .set_json(&json!({"status": "rejected"}))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["status"], "rejected");

    let req = test::TestRequest::patch()
        .uri(&format!("/api/listings/{id}"))
        .insert_header(bearer(&owner))
        .set_json(&json!({"price": "2500000"}))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["price"], "2500000");
}

#[actix_web::test]
async fn seed_is_idempotent_and_can_be_disabled() {
    let env = default_env();
    let app = app!(env);

    let req = test::TestRequest::post().uri("/api/seed").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Seeded 5 listings (0 already present)");
    assert_eq!(body["ids"].as_array().unwrap().len(), 5);

    let req = test::TestRequest::post().uri("/api/seed").to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["message"], "Seeded 0 listings (5 already present)");

    let req = test::TestRequest::get().uri("/api/listings").to_request();
    let listings = json_body(test::call_service(&app, req).await).await;
    assert_eq!(listings.as_array().unwrap().len(), 5);
    let req = test::TestRequest::get().uri("/api/listings?category=roommate").to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await.as_array().unwrap().len(), 2);

    let env = test_env(AppConfig { allow_seed: false, ..Default::default() });
    let app = app!(env);
    let req = test::TestRequest::post().uri("/api/seed").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn favorites_toggle_and_count() {
    let env = default_env();
    let app = app!(env);
    let user = env.user_with_role("lan", Role::User).await;
    let req = test::TestRequest::post().uri("/api/seed").to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post().uri("/api/favorites/rm-seed1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
    let req = test::TestRequest::post()
        .uri("/api/favorites/rm-missing")
        .insert_header(bearer(&user))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post()
        .uri("/api/favorites/rm-seed1")
        .insert_header(bearer(&user))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await, json!({"favorited": true}));
    let req = test::TestRequest::get()
        .uri("/api/favorites/rm-seed1")
        .insert_header(bearer(&user))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await, json!({"favorited": true}));
    let req = test::TestRequest::get().uri("/api/favorites").insert_header(bearer(&user)).to_request();
    let favs = json_body(test::call_service(&app, req).await).await;
    assert_eq!(favs.as_array().unwrap().len(), 1);
    assert_eq!(favs[0]["listingId"], "rm-seed1");
    let req = test::TestRequest::get().uri("/api/listings/rm-seed1").to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["favoriteCount"], 1);

    let req = test::TestRequest::post()
        .uri("/api/favorites/rm-seed1")
        .insert_header(bearer(&user))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await, json!({"favorited": false}));
    let req = test::TestRequest::get().uri("/api/listings/rm-seed1").to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["favoriteCount"], 0);
}

#[actix_web::test]
async fn reports_are_reviewed_forward_only() {
    let env = default_env();
    let app = app!(env);
    let user = env.user_with_role("lan", Role::User).await;
    let moderator = env.user_with_role("mod1", Role::Moderator).await;
    let req = test::TestRequest::post().uri("/api/seed").to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/reports")
        .set_json(&json!({"listingId": "rs-seed1", "reason": "scam", "details": "  đòi cọc trước  "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let report = json_body(resp).await;
    assert_eq!(report["reportedBy"], "anonymous");
    assert_eq!(report["status"], "pending");
    assert_eq!(report["details"], "đòi cọc trước");
    let report_id = report["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/reports")
        .set_json(&json!({"listingId": "rs-nothing", "reason": "spam"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::get().uri("/api/admin/reports").insert_header(bearer(&user)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    assert_eq!(json_body(resp).await["error"], "Moderator only");

    let req = test::TestRequest::get()
        .uri("/api/admin/reports?status=pending")
        .insert_header(bearer(&moderator))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await.as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/reports/{report_id}/status"))
        .insert_header(bearer(&moderator))
        .set_json(&json!({"status": "resolved"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "resolved");
    assert_eq!(body["reviewedBy"], "mod1");

    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/reports/{report_id}/status"))
        .insert_header(bearer(&moderator))
        .set_json(&json!({"status": "reviewed"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get()
        .uri("/api/admin/reports?status=pending")
        .insert_header(bearer(&moderator))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await, json!([]));
    let req = test::TestRequest::get()
        .uri("/api/admin/reports?status=resolved")
        .insert_header(bearer(&moderator))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn profile_is_created_on_first_access_and_role_is_not_editable() {
    let env = default_env();
    let app = app!(env);
    let token = env.token("lan", Some("lan@example.com"));

    let req = test::TestRequest::get().uri("/api/me").insert_header(bearer(&token)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let me = json_body(resp).await;
    assert_eq!(me["uid"], "lan");
    assert_eq!(me["role"], "user");

    let req = test::TestRequest::patch()
        .uri("/api/me")
        .insert_header(bearer(&token))
        .set_json(&json!({"role": "admin"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(json_body(resp).await["error"].is_string());

    let req = test::TestRequest::patch()
        .uri("/api/me")
        .insert_header(bearer(&token))
        .set_json(&json!({"occupation": "Sinh viên", "birthYear": 2001}))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["occupation"], "Sinh viên");
    assert_eq!(body["birthYear"], 2001);
    assert_eq!(body["role"], "user");
}

#[actix_web::test]
async fn community_posts_comments_and_likes() {
    let env = default_env();
    let app = app!(env);
    let token = env.token("lan", None);

    let req = test::TestRequest::post()
        .uri("/api/community/posts")
        .insert_header(bearer(&token))
        .set_json(&json!({"content": "   "}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/community/posts")
        .insert_header(bearer(&token))
        .set_json(&json!({"title": "Hỏi", "content": "Khu nào gần ĐH Bách Khoa?"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let post_id = json_body(resp).await["id"].as_str().unwrap().to_string();

    for text in ["Quận 10", "Thủ Đức"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/community/posts/{post_id}/comments"))
            .insert_header(bearer(&token))
            .set_json(&json!({"content": text}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }
    let req = test::TestRequest::get().uri(&format!("/api/community/posts/{post_id}/comments")).to_request();
    let comments = json_body(test::call_service(&app, req).await).await;
    assert_eq!(comments[0]["content"], "Quận 10");
    assert_eq!(comments[1]["content"], "Thủ Đức");

    let req = test::TestRequest::get().uri("/api/community/posts/nope/comments").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post()
        .uri(&format!("/api/community/posts/{post_id}/like"))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await, json!({"liked": true}));

    let req = test::TestRequest::get().uri("/api/community/posts").to_request();
    let posts = json_body(test::call_service(&app, req).await).await;
    assert_eq!(posts[0]["commentCount"], 2);
    assert_eq!(posts[0]["likeCount"], 1);
}

#[actix_web::test]
async fn malformed_json_is_reported_as_error_body() {
    let env = default_env();
    let app = app!(env);
    let token = env.token("lan", None);
    let req = test::TestRequest::post()
        .uri("/api/listings")
        .insert_header(bearer(&token))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"title\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(json_body(resp).await["error"].is_string());
}

#[actix_web::test]
async fn health_and_metrics_endpoints() {
    let env = default_env();
    let app = app!(env);
    let req = test::TestRequest::get().uri("/healthz").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    // no recorder installed in tests
    let req = test::TestRequest::get().uri("/metrics").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}
