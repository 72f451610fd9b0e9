#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use oghep::identity::{Identity, JwtIdentityProvider};
use oghep::models::{Category, Contact, NewListing, Role, RoommateType};
use oghep::repo::UserRepo;
use oghep::store::InMemStore;
use oghep::{AppConfig, AppState};

pub const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

pub struct TestEnv {
    pub store: Arc<InMemStore>,
    pub idp: Arc<JwtIdentityProvider>,
    pub state: AppState,
}

pub fn test_env(mut cfg: AppConfig) -> TestEnv {
    cfg.jwt_secret = SECRET.into();
    let store = Arc::new(InMemStore::ephemeral());
    let idp = Arc::new(JwtIdentityProvider::new(SECRET).with_revocation_store(store.clone()));
    let state = AppState::build(cfg, store.clone(), idp.clone());
    TestEnv { store, idp, state }
}

pub fn default_env() -> TestEnv {
    test_env(AppConfig::default())
}

impl TestEnv {
    pub fn token(&self, uid: &str, email: Option<&str>) -> String {
        let mut who = Identity::new(uid);
        who.email = email.map(Into::into);
        self.idp.issue_token(&who, Duration::hours(1)).unwrap()
    }

    /// Store a profile with `role` and return a token for it.
    pub async fn user_with_role(&self, uid: &str, role: Role) -> String {
        let who = Identity::new(uid).with_email(format!("{uid}@example.com"));
        self.state.repo.upsert_role(&who, role).await.unwrap();
        self.token(uid, who.email.as_deref())
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub fn roommate_listing(title: &str) -> NewListing {
    NewListing {
        category: Category::Roommate,
        roommate_type: Some(RoommateType::HaveRoom),
        title: title.into(),
        price: "3000000".into(),
        city: Some("Hồ Chí Minh".into()),
        contact: Contact { phone: "0901234567".into(), ..Default::default() },
        ..Default::default()
    }
}
