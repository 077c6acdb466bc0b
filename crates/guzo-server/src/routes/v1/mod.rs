use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::App;

pub mod morphers;

mod admin;
mod bookings;
mod favorites;
mod payments;
mod pricing;
mod reviews;
mod trips;
mod users;
mod vehicles;
mod verification;

/// Builds the base router for Guzo API v1.
pub fn build_axum_router(app: App) -> Router {
    Router::new()
        // users
        .route("/users/register", post(self::users::register))
        .route("/users/login", post(self::users::login))
        .route(
            "/users/@me",
            get(self::users::me).patch(self::users::update_me),
        )
        .route("/users/@me/toggle-online", post(self::users::toggle_online))
        .route("/users/@me/schedule", put(self::users::update_schedule))
        .route("/users/@me/earnings", get(self::users::my_earnings))
        .route("/users/:id/reviews", get(self::reviews::list_for_user))
        // trips
        .route("/trips", get(self::trips::search).post(self::trips::create))
        .route("/trips/upcoming", get(self::trips::upcoming))
        .route("/trips/mine", get(self::trips::list_mine))
        .route("/trips/suggest-pricing", get(self::trips::suggest_pricing))
        .route(
            "/trips/:id",
            get(self::trips::get)
                .patch(self::trips::update)
                .delete(self::trips::delete),
        )
        .route("/trips/:id/bookings", get(self::trips::bookings))
        // bookings
        .route(
            "/bookings",
            get(self::bookings::list_mine).post(self::bookings::book_trip),
        )
        .route("/bookings/charter", post(self::bookings::request_charter))
        .route("/bookings/assigned", get(self::bookings::list_assigned))
        .route("/bookings/requests", get(self::bookings::open_requests))
        .route("/bookings/all", get(self::bookings::list_all))
        .route("/bookings/:id", get(self::bookings::get))
        .route("/bookings/:id/cancel", post(self::bookings::cancel))
        .route("/bookings/:id/complete", post(self::bookings::complete))
        .route("/bookings/:id/assign", post(self::bookings::assign))
        .route("/bookings/:id/accept", post(self::bookings::accept))
        .route("/bookings/:id/candidates", get(self::bookings::candidates))
        .route("/bookings/:id/rebook", post(self::bookings::rebook))
        // vehicles
        .route(
            "/vehicles",
            get(self::vehicles::list_mine).post(self::vehicles::register),
        )
        .route(
            "/vehicles/:id",
            axum::routing::patch(self::vehicles::update).delete(self::vehicles::delete),
        )
        .route("/vehicles/:id/verify", post(self::vehicles::verify))
        // payments
        .route(
            "/payments",
            get(self::payments::list_mine).post(self::payments::record),
        )
        .route("/payments/earnings", get(self::payments::earnings))
        .route("/payments/booking/:id", get(self::payments::list_for_booking))
        .route("/payments/:id/complete", post(self::payments::complete))
        .route("/payments/:id/fail", post(self::payments::fail))
        // pricing
        .route("/pricing/quote", get(self::pricing::quote))
        .route(
            "/pricing/rules",
            get(self::pricing::list_rules).post(self::pricing::create_rule),
        )
        .route(
            "/pricing/rules/:id",
            axum::routing::patch(self::pricing::update_rule).delete(self::pricing::delete_rule),
        )
        .route(
            "/pricing/surges",
            get(self::pricing::list_surges).post(self::pricing::create_surge),
        )
        .route(
            "/pricing/surges/:id",
            axum::routing::patch(self::pricing::update_surge).delete(self::pricing::delete_surge),
        )
        .route(
            "/pricing/surges/:id/deactivate",
            post(self::pricing::deactivate_surge),
        )
        .route("/pricing/demand", get(self::pricing::demand))
        // reviews
        .route("/reviews", post(self::reviews::submit))
        .route("/reviews/pending", get(self::reviews::pending))
        // favorites
        .route(
            "/favorites/routes",
            get(self::favorites::list_routes).post(self::favorites::add_route),
        )
        .route("/favorites/routes/:id", delete(self::favorites::remove_route))
        .route(
            "/favorites/drivers",
            get(self::favorites::list_drivers).post(self::favorites::add_driver),
        )
        .route(
            "/favorites/drivers/:id",
            delete(self::favorites::remove_driver),
        )
        // verification
        .route("/verification", get(self::verification::list))
        .route(
            "/verification/@me",
            get(self::verification::mine).post(self::verification::submit),
        )
        .route("/verification/stats", get(self::verification::stats))
        .route(
            "/verification/:id/review",
            post(self::verification::start_review),
        )
        .route("/verification/:id/approve", post(self::verification::approve))
        .route("/verification/:id/reject", post(self::verification::reject))
        // admin
        .route("/admin/stats", get(self::admin::stats))
        .route("/admin/users", get(self::admin::list_users))
        .route("/admin/users/:id/activate", post(self::admin::activate_user))
        .route(
            "/admin/users/:id/deactivate",
            post(self::admin::deactivate_user),
        )
        .route("/admin/analytics/platform", get(self::admin::platform_stats))
        .route(
            "/admin/analytics/drivers/:id",
            get(self::admin::driver_earnings),
        )
        .with_state(app)
}
