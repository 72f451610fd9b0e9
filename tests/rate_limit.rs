mod common;

use std::net::SocketAddr;
use std::time::Duration;

use actix_web::{test, web, App};
use oghep::models::Role;
use oghep::rate_limit::RateLimitConfig;
use oghep::{config, AppConfig};
use serde_json::json;

use common::{bearer, roommate_listing, test_env};

fn limited(listing_limit: usize, report_limit: usize) -> AppConfig {
    AppConfig {
        rate_limit_enabled: true,
        rate_limits: RateLimitConfig {
            listing_limit,
            listing_window: Duration::from_secs(3600),
            report_limit,
            report_window: Duration::from_secs(3600),
        },
        ..Default::default()
    }
}

#[actix_web::test]
async fn listing_creation_is_limited_per_user() {
    let env = test_env(limited(1, 10));
    let app = test::init_service(App::new().app_data(web::Data::new(env.state.clone())).configure(config)).await;
    let lan = env.user_with_role("lan", Role::User).await;
    let minh = env.user_with_role("minh", Role::User).await;

    let post = |token: &str, title: &str| {
        test::TestRequest::post()
            .uri("/api/listings")
            .insert_header(bearer(token))
            .set_json(&roommate_listing(title))
            .to_request()
    };

    assert_eq!(test::call_service(&app, post(&lan, "Phòng 1")).await.status(), 201);
    let resp = test::call_service(&app, post(&lan, "Phòng 2")).await;
    assert_eq!(resp.status(), 429);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert!(body["error"].is_string());

    // a different user has a separate budget
    assert_eq!(test::call_service(&app, post(&minh, "Phòng 3")).await.status(), 201);
}

fn report(peer: &str, forwarded_for: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/reports")
        .peer_addr(SocketAddr::new(peer.parse().unwrap(), 40000))
        .insert_header(("X-Forwarded-For", forwarded_for.to_string()))
        .set_json(&json!({"listingId": "st-seed1", "reason": "spam"}))
}

#[actix_web::test]
async fn reports_are_limited_per_client_ip() {
    let env = test_env(limited(5, 2));
    let app = test::init_service(App::new().app_data(web::Data::new(env.state.clone())).configure(config)).await;
    let req = test::TestRequest::post().uri("/api/seed").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    for i in 0..2 {
        let resp = test::call_service(&app, report("203.0.113.7", &format!("10.0.0.{i}")).to_request()).await;
        assert_eq!(resp.status(), 201);
    }
    // rotating the forwarded header does not buy a fresh budget
    assert_eq!(test::call_service(&app, report("203.0.113.7", "10.9.9.9").to_request()).await.status(), 429);
    assert_eq!(test::call_service(&app, report("198.51.100.2", "10.0.0.0").to_request()).await.status(), 201);
}

#[actix_web::test]
async fn forwarded_header_keys_reports_behind_a_trusted_proxy() {
    let env = test_env(AppConfig { trust_proxy: true, ..limited(5, 1) });
    let app = test::init_service(App::new().app_data(web::Data::new(env.state.clone())).configure(config)).await;
    let req = test::TestRequest::post().uri("/api/seed").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // every request arrives from the proxy's address
    assert_eq!(test::call_service(&app, report("192.0.2.1", "203.0.113.7").to_request()).await.status(), 201);
    assert_eq!(test::call_service(&app, report("192.0.2.1", "203.0.113.7").to_request()).await.status(), 429);
    assert_eq!(test::call_service(&app, report("192.0.2.1", "198.51.100.2").to_request()).await.status(), 201);
}

#[actix_web::test]
async fn disabled_limiter_never_rejects() {
    let env = test_env(AppConfig { rate_limit_enabled: false, ..limited(1, 1) });
    let app = test::init_service(App::new().app_data(web::Data::new(env.state.clone())).configure(config)).await;
    let lan = env.user_with_role("lan", Role::User).await;
    for i in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/listings")
            .insert_header(bearer(&lan))
            .set_json(&roommate_listing(&format!("Phòng {i}")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }
}
