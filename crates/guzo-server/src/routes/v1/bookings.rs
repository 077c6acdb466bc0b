use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::bookings::{
    AcceptRequest, AssignBooking, BookTrip, ListBookings, RequestCharter,
};
use guzo_error::ApiError;
use guzo_model::id::{BookingId, TripId, UserId};

use super::morphers;
use crate::extract::{Json, SessionAdmin, SessionDriver, SessionUser};
use crate::{services, App};

pub async fn book_trip(
    app: App,
    session_user: SessionUser,
    Json(form): Json<BookTrip>,
) -> Result<Response, ApiError> {
    let request = services::bookings::BookTrip {
        trip_id: TripId(form.trip_id),
        seats: form.seats,
        whole_car: form.whole_car,
        customer_name: form.customer_name.as_deref(),
        customer_phone: form.customer_phone.as_deref(),
        notes: form.notes.as_deref(),
        special_requests: form.special_requests.as_deref(),
    };

    let booking = request.perform(&app, &session_user).await?;
    Ok(Json(morphers::booking(&booking)).into_response())
}

pub async fn request_charter(
    app: App,
    session_user: SessionUser,
    Json(form): Json<RequestCharter>,
) -> Result<Response, ApiError> {
    let request = services::bookings::RequestCharter {
        pickup_location: &form.pickup_location,
        dropoff_location: &form.dropoff_location,
        scheduled_time: form.scheduled_time.into(),
        seats: form.seats,
        customer_name: form.customer_name.as_deref(),
        customer_phone: form.customer_phone.as_deref(),
        notes: form.notes.as_deref(),
        special_requests: form.special_requests.as_deref(),
    };

    let booking = request.perform(&app, &session_user).await?;
    Ok(Json(morphers::booking(&booking)).into_response())
}

pub async fn get(
    app: App,
    session_user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let view = services::bookings::GetBooking { id: BookingId(id) }
        .perform(&app, &session_user)
        .await?;

    Ok(Json(morphers::booking_view(&view)).into_response())
}

pub async fn cancel(
    app: App,
    session_user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let booking = services::bookings::CancelBooking { id: BookingId(id) }
        .perform(&app, &session_user)
        .await?;

    Ok(Json(morphers::booking(&booking)).into_response())
}

pub async fn complete(
    app: App,
    driver: SessionDriver,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let booking = services::bookings::CompleteBooking { id: BookingId(id) }
        .perform(&app, &driver)
        .await?;

    Ok(Json(morphers::booking(&booking)).into_response())
}

pub async fn assign(
    app: App,
    admin: SessionAdmin,
    Path(id): Path<i64>,
    Json(form): Json<AssignBooking>,
) -> Result<Response, ApiError> {
    let request = services::bookings::MatchRequest {
        booking_id: BookingId(id),
        driver_id: UserId(form.driver_id),
        trip_id: form.trip_id.map(TripId),
        price: form.price,
    };

    let booking = request.perform(&app, &admin).await?;
    Ok(Json(morphers::booking(&booking)).into_response())
}

pub async fn accept(
    app: App,
    driver: SessionDriver,
    Path(id): Path<i64>,
    Json(form): Json<AcceptRequest>,
) -> Result<Response, ApiError> {
    let booking = services::bookings::AcceptRequest {
        booking_id: BookingId(id),
        price: form.price,
    }
    .perform(&app, &driver)
    .await?;

    Ok(Json(morphers::booking(&booking)).into_response())
}

pub async fn candidates(
    app: App,
    driver: SessionDriver,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let trips = services::bookings::ListCandidates {
        booking_id: BookingId(id),
    }
    .perform(&app, &driver)
    .await?;

    let trips = trips.iter().map(morphers::trip).collect::<Vec<_>>();
    Ok(Json(trips).into_response())
}

pub async fn rebook(
    app: App,
    session_user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let booking = services::bookings::Rebook {
        booking_id: BookingId(id),
    }
    .perform(&app, &session_user)
    .await?;

    Ok(Json(morphers::booking(&booking)).into_response())
}

pub async fn list_mine(app: App, session_user: SessionUser) -> Result<Response, ApiError> {
    let bookings = services::bookings::ListMyBookings
        .perform(&app, &session_user)
        .await?;

    let bookings = bookings.iter().map(morphers::booking_view).collect::<Vec<_>>();
    Ok(Json(bookings).into_response())
}

pub async fn list_assigned(app: App, driver: SessionDriver) -> Result<Response, ApiError> {
    let bookings = services::bookings::ListDriverBookings
        .perform(&app, &driver)
        .await?;

    let bookings = bookings.iter().map(morphers::booking_view).collect::<Vec<_>>();
    Ok(Json(bookings).into_response())
}

pub async fn open_requests(app: App, driver: SessionDriver) -> Result<Response, ApiError> {
    let requests = services::bookings::ListOpenRequests
        .perform(&app, &driver)
        .await?;

    let requests = requests.iter().map(morphers::booking).collect::<Vec<_>>();
    Ok(Json(requests).into_response())
}

pub async fn list_all(
    app: App,
    admin: SessionAdmin,
    Query(query): Query<ListBookings>,
) -> Result<Response, ApiError> {
    let bookings = services::bookings::ListAllBookings {
        status: query.status,
    }
    .perform(&app, &admin)
    .await?;

    let bookings = bookings.iter().map(morphers::booking_view).collect::<Vec<_>>();
    Ok(Json(bookings).into_response())
}

#[cfg(test)]
mod tests {
    use crate::test_utils;
    use serde_json::json;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn books_seats_end_to_end(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let mut server = test_utils::test_server(&app);

        let driver = test_utils::users::driver_session(&app, "e2e-driver").await;
        let rider = test_utils::users::rider_session(&app, "e2e-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        test_utils::users::authorize(&mut server, &app, &rider);

        let response = server
            .post("/api/v1/bookings")
            .json(&json!({ "trip_id": trip.id.0, "seats": 2 }))
            .await;

        response.assert_status_ok();
        response.assert_json_contains(&json!({
            "booking_type": "seat",
            "seats_booked": 2,
            "price": 1600.0,
            "status": "pending",
        }));

        // remaining seats shrink on the public trip view
        let response = server.get(&format!("/api/v1/trips/{}", trip.id.0)).await;
        response.assert_status_ok();
        response.assert_json_contains(&json!({ "remaining_seats": 2 }));
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn seat_contention_maps_to_conflict(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let mut server = test_utils::test_server(&app);

        let driver = test_utils::users::driver_session(&app, "e2e-full-driver").await;
        let rider = test_utils::users::rider_session(&app, "e2e-full-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 1).await;

        test_utils::users::authorize(&mut server, &app, &rider);

        let response = server
            .post("/api/v1/bookings")
            .json(&json!({ "trip_id": trip.id.0, "seats": 2 }))
            .await;

        response.assert_status(axum::http::StatusCode::CONFLICT);
        response.assert_json_contains(&json!({
            "code": "book_trip_failed",
            "subcode": "not_enough_seats",
        }));
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn charter_flow_matches_through_the_api(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);

        let admin = test_utils::users::admin_session(&app, "e2e-admin").await;
        let driver = test_utils::users::driver_session(&app, "e2e-charter-driver").await;
        let rider = test_utils::users::rider_session(&app, "e2e-charter-rider").await;
        let trip = test_utils::trips::publish(&app, &driver, 4).await;

        let mut rider_server = test_utils::test_server(&app);
        test_utils::users::authorize(&mut rider_server, &app, &rider);

        let response = rider_server
            .post("/api/v1/bookings/charter")
            .json(&json!({
                "pickup_location": "Addis Ababa",
                "dropoff_location": "Bahir Dar",
                "scheduled_time": trip.departure_time.and_utc().to_rfc3339(),
                "seats": 2,
            }))
            .await;
        response.assert_status_ok();
        let request_id = response.json::<serde_json::Value>()["id"].as_i64().unwrap();

        let mut admin_server = test_utils::test_server(&app);
        test_utils::users::authorize(&mut admin_server, &app, &admin);

        let response = admin_server
            .get(&format!("/api/v1/bookings/{request_id}/candidates"))
            .await;
        response.assert_status_ok();
        let candidates: serde_json::Value = response.json();
        assert_eq!(candidates[0]["id"].as_i64().unwrap(), trip.id.0);

        let response = admin_server
            .post(&format!("/api/v1/bookings/{request_id}/assign"))
            .json(&json!({ "driver_id": driver.id.0, "trip_id": trip.id.0 }))
            .await;
        response.assert_status_ok();
        response.assert_json_contains(&json!({
            "status": "confirmed",
            "price": 1600.0,
        }));

        // a second assignment attempt conflicts
        let response = admin_server
            .post(&format!("/api/v1/bookings/{request_id}/assign"))
            .json(&json!({ "driver_id": driver.id.0 }))
            .await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
        response.assert_json_contains(&json!({
            "code": "match_request_failed",
            "subcode": "already_matched",
        }));
    }
}
