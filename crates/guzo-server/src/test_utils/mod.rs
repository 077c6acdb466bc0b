//! Shared fixtures for the service and API test suites.
use axum_test::TestServer;

use crate::App;

pub mod bookings;
pub mod trips;
pub mod users;

/// Wraps the harness pool into an [`App`]. Call this first in every
/// test.
pub fn build_app(pool: sqlx::PgPool) -> App {
    guzo_tracing::init_for_tests();
    App::new_for_tests(guzo_db::PgPool::build_for_tests(pool))
}

/// Boots the full router on top of the app for end-to-end API tests.
pub fn test_server(app: &App) -> TestServer {
    TestServer::new(crate::build_axum_router(app.clone())).expect("unable to build test server")
}
