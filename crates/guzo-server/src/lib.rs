//! The Guzo HTTP server: router, services and middleware.
mod app;

pub mod auth;
pub mod extract;
pub mod headers;
pub mod middleware;
pub mod routes;
pub mod services;

#[cfg(test)]
pub mod test_utils;

pub use self::app::App;
pub use self::routes::build_axum_router;
