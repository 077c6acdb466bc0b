use axum::http::header;
use axum_test::TestServer;
use guzo_api_types::user::UserRole;
use guzo_model::user::InsertUser;
use guzo_model::User;
use guzo_utils::Sensitive;
use std::sync::OnceLock;

use crate::auth::jwt::LoginClaims;
use crate::extract::{SessionAdmin, SessionDriver, SessionUser};
use crate::services;
use crate::App;

pub const TEST_PASSWORD: &str = "selam-addis";

// hashing is deliberately slow; do it once per test binary
fn test_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| guzo_crypto::argon2::hash(TEST_PASSWORD).expect("argon2 must hash"))
}

fn phone_for(name: &str) -> String {
    let digest = name
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    format!("+2519{:08}", digest % 100_000_000)
}

async fn register(app: &App, name: &str, role: UserRole) -> User {
    let email = format!("{name}@example.com");
    let phone = phone_for(name);

    let response = services::users::Register {
        email: Sensitive::new(&email),
        phone: Sensitive::new(&phone),
        full_name: name,
        password: Sensitive::new(TEST_PASSWORD),
        role,
        language: None,
    }
    .perform(app)
    .await
    .expect("user fixture must register");

    response.user
}

/// Registers a rider through the real registration service.
pub async fn rider_session(app: &App, name: &str) -> SessionUser {
    let user = register(app, name, UserRole::Rider).await;
    SessionUser { user }
}

/// Registers a driver through the real registration service.
pub async fn driver_session(app: &App, name: &str) -> SessionDriver {
    let user = register(app, name, UserRole::Driver).await;
    SessionDriver(SessionUser { user })
}

/// Admins cannot self-register; seed one directly.
pub async fn admin_session(app: &App, name: &str) -> SessionAdmin {
    let email = format!("{name}@example.com");
    let phone = phone_for(name);

    let mut conn = app.db_write().await.expect("must open transaction");
    let user = InsertUser::builder()
        .email(&email)
        .phone(&phone)
        .full_name(name)
        .role(UserRole::Admin)
        .password_hash(test_password_hash())
        .build()
        .insert(&mut conn)
        .await
        .expect("admin fixture must insert");
    conn.commit().await.expect("must commit admin fixture");

    SessionAdmin(SessionUser { user })
}

/// Attaches a valid bearer token for `user` to every subsequent
/// request of the test server.
pub fn authorize(server: &mut TestServer, app: &App, user: &User) {
    let token = LoginClaims::generate(app, user)
        .encode(app)
        .expect("must encode login token");

    server.add_header(header::AUTHORIZATION, format!("Bearer {token}"));
}
