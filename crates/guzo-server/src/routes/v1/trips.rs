use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Response};
use guzo_api_types::routes::trips::{
    CreateTrip, ListDriverTrips, ListUpcoming, SearchTrips, SuggestTripPricing, UpdateTrip,
};
use guzo_error::ApiError;
use guzo_model::id::TripId;

use super::morphers;
use crate::extract::{Json, SessionDriver, SessionUser};
use crate::{services, App};

pub async fn create(
    app: App,
    driver: SessionDriver,
    Json(form): Json<CreateTrip>,
) -> Result<Response, ApiError> {
    let request = services::trips::CreateTrip {
        origin: &form.origin,
        destination: &form.destination,
        departure_time: form.departure_time.into(),
        estimated_arrival: form.estimated_arrival.map(Into::into),
        available_seats: form.available_seats,
        price_per_seat: form.price_per_seat,
        whole_car_price: form.whole_car_price,
        vehicle_id: form.vehicle_id,
        notes: form.notes.as_deref(),
        waypoints: form.waypoints,
    };

    let trip = request.perform(&app, &driver).await?;
    Ok(Json(morphers::trip(&trip)).into_response())
}

pub async fn update(
    app: App,
    driver: SessionDriver,
    Path(id): Path<i64>,
    Json(form): Json<UpdateTrip>,
) -> Result<Response, ApiError> {
    let request = services::trips::UpdateTrip {
        id: TripId(id),
        departure_time: form.departure_time.map(Into::into),
        estimated_arrival: form.estimated_arrival.map(Into::into),
        available_seats: form.available_seats,
        price_per_seat: form.price_per_seat,
        whole_car_price: form.whole_car_price,
        status: form.status,
        notes: form.notes.as_deref(),
    };

    let trip = request.perform(&app, &driver).await?;
    Ok(Json(morphers::trip(&trip)).into_response())
}

pub async fn delete(
    app: App,
    driver: SessionDriver,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    services::trips::DeleteTrip { id: TripId(id) }
        .perform(&app, &driver)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })).into_response())
}

pub async fn get(app: App, Path(id): Path<i64>) -> Result<Response, ApiError> {
    let view = services::trips::GetTrip { id: TripId(id) }.perform(&app).await?;
    Ok(Json(morphers::trip_view(&view)).into_response())
}

pub async fn search(app: App, Query(query): Query<SearchTrips>) -> Result<Response, ApiError> {
    let request = services::trips::SearchTrips {
        origin: query.origin.as_deref(),
        destination: query.destination.as_deref(),
        date: query.date,
        min_seats: query.min_seats,
    };

    let trips = request.perform(&app).await?;
    let trips = trips.iter().map(morphers::trip_view).collect::<Vec<_>>();
    Ok(Json(trips).into_response())
}

pub async fn upcoming(app: App, Query(query): Query<ListUpcoming>) -> Result<Response, ApiError> {
    let trips = services::trips::ListUpcomingTrips { limit: query.limit }
        .perform(&app)
        .await?;

    let trips = trips.iter().map(morphers::trip_view).collect::<Vec<_>>();
    Ok(Json(trips).into_response())
}

pub async fn list_mine(
    app: App,
    driver: SessionDriver,
    Query(query): Query<ListDriverTrips>,
) -> Result<Response, ApiError> {
    let trips = services::trips::ListDriverTrips {
        include_past: query.include_past,
    }
    .perform(&app, &driver)
    .await?;

    let trips = trips.iter().map(morphers::trip).collect::<Vec<_>>();
    Ok(Json(trips).into_response())
}

pub async fn suggest_pricing(
    app: App,
    _driver: SessionDriver,
    Query(query): Query<SuggestTripPricing>,
) -> Result<Response, ApiError> {
    let suggestion = services::pricing::SuggestTripPricing {
        origin: &query.origin,
        destination: &query.destination,
    }
    .perform(&app)
    .await?;

    Ok(Json(suggestion).into_response())
}

pub async fn bookings(
    app: App,
    session_user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let bookings = services::trips::ListTripBookings { trip_id: TripId(id) }
        .perform(&app, &session_user)
        .await?;

    let bookings = bookings.iter().map(morphers::booking).collect::<Vec<_>>();
    Ok(Json(bookings).into_response())
}

#[cfg(test)]
mod tests {
    use crate::test_utils;
    use serde_json::json;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn riders_cannot_publish_trips(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let mut server = test_utils::test_server(&app);

        let rider = test_utils::users::rider_session(&app, "trip-rider").await;
        test_utils::users::authorize(&mut server, &app, &rider);

        let response = server
            .post("/api/v1/trips")
            .json(&json!({
                "origin": "Addis Ababa",
                "destination": "Hawassa",
                "departure_time": "2030-01-15T08:00:00Z",
                "available_seats": 4,
                "price_per_seat": 500.0,
                "whole_car_price": 1800.0,
            }))
            .await;

        response.assert_status_unauthorized();
        response.assert_json_contains(&json!({ "code": "access_denied" }));
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn publishes_and_searches_trips(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let mut server = test_utils::test_server(&app);

        let driver = test_utils::users::driver_session(&app, "trip-driver").await;
        test_utils::users::authorize(&mut server, &app, &driver);

        let response = server
            .post("/api/v1/trips")
            .json(&json!({
                "origin": "Addis Ababa",
                "destination": "Hawassa",
                "departure_time": "2030-01-15T08:00:00Z",
                "available_seats": 4,
                "price_per_seat": 500.0,
                "whole_car_price": 1800.0,
            }))
            .await;

        response.assert_status_ok();
        response.assert_json_contains(&json!({
            "origin": "Addis Ababa",
            "remaining_seats": 4,
            "status": "scheduled",
        }));

        let response = server.get("/api/v1/trips?destination=hawassa").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["driver_name"], "trip-driver");
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn upcoming_is_public(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let server = test_utils::test_server(&app);

        let driver = test_utils::users::driver_session(&app, "trip-upcoming").await;
        test_utils::trips::publish(&app, &driver, 4).await;

        let response = server.get("/api/v1/trips/upcoming").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
